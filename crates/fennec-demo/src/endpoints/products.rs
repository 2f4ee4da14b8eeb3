use chrono::{DateTime, Utc};
use fennec_core::prelude::*;

use crate::models::Product;
use crate::store::ProductCatalog;

#[derive(Debug, BindRequest)]
pub struct GetProductsRequest {
    pub category: Option<String>,
    pub in_stock: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct GetProductsResponse {
    pub products: Vec<Product>,
    pub total_count: usize,
}

#[derive(Injectable)]
pub struct GetProducts {
    catalog: Arc<ProductCatalog>,
}

#[async_trait]
impl Endpoint for GetProducts {
    type Request = GetProductsRequest;
    type Response = GetProductsResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .get("/api/products")
            .name("GetProducts")
            .tags(["Products"])
            .produces_type::<GetProductsResponse>(200)
            .allow_anonymous();
    }

    async fn handle(
        &self,
        request: GetProductsRequest,
        _cx: HandlerContext,
        send: Responder<GetProductsResponse>,
    ) -> Result<Sent, FennecError> {
        let products = self
            .catalog
            .list(request.category.as_deref(), request.in_stock);
        Ok(send.ok(GetProductsResponse {
            total_count: products.len(),
            products,
        }))
    }
}

#[derive(Debug, BindRequest)]
pub struct DeleteProductRequest {
    pub id: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteProductResponse {
    pub id: i32,
    pub message: String,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Injectable)]
pub struct DeleteProduct {
    catalog: Arc<ProductCatalog>,
}

#[async_trait]
impl Endpoint for DeleteProduct {
    type Request = DeleteProductRequest;
    type Response = DeleteProductResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .delete("/api/products/{id}")
            .tags(["Products"])
            .produces_type::<DeleteProductResponse>(200)
            .produces_problem(404)
            .allow_anonymous();
    }

    async fn handle(
        &self,
        request: DeleteProductRequest,
        _cx: HandlerContext,
        send: Responder<DeleteProductResponse>,
    ) -> Result<Sent, FennecError> {
        let Some(product) = self.catalog.remove(request.id) else {
            return Ok(send.not_found_message(format!("Product {} does not exist", request.id)));
        };
        tracing::info!(
            product_id = product.id,
            reason = request.reason.as_deref().unwrap_or("-"),
            "product deleted"
        );
        Ok(send.ok(DeleteProductResponse {
            id: product.id,
            message: format!("Product {} deleted successfully", product.id),
            deleted_at: Utc::now(),
        }))
    }
}
