use fennec_core::endpoint::{
    BindingMode, EndpointRegistration, HttpMethod, describe_all, discover_endpoints,
    registered_endpoints,
};
use fennec_core::prelude::*;
use fennec_core::{ConfigurationError, ServiceProvider};

#[derive(BindRequest)]
struct IdRequest {
    id: i64,
}

#[derive(Default, Deserialize, BindRequest)]
#[bind(json)]
#[serde(default)]
struct RenameRequest {
    id: i64,
    name: String,
}

#[derive(Injectable)]
struct ListWidgets;

#[async_trait]
impl Endpoint for ListWidgets {
    type Request = ();
    type Response = Vec<String>;

    fn configure(route: &mut RouteConfig) {
        route.get("/widgets").tags(["Widgets"]);
    }

    async fn handle(
        &self,
        _request: (),
        _cx: HandlerContext,
        send: Responder<Vec<String>>,
    ) -> Result<Sent, FennecError> {
        Ok(send.ok(vec!["a".to_string()]))
    }
}

#[derive(Injectable)]
struct GetWidget;

#[async_trait]
impl Endpoint for GetWidget {
    type Request = IdRequest;
    type Response = i64;

    fn configure(route: &mut RouteConfig) {
        route.get("/widgets/{id}");
    }

    async fn handle(
        &self,
        request: IdRequest,
        _cx: HandlerContext,
        send: Responder<i64>,
    ) -> Result<Sent, FennecError> {
        Ok(send.ok(request.id))
    }
}

#[derive(Injectable)]
struct RenameWidget;

#[async_trait]
impl Endpoint for RenameWidget {
    type Request = RenameRequest;
    type Response = ();

    fn configure(route: &mut RouteConfig) {
        route.patch("/widgets/{id}");
    }

    async fn handle(
        &self,
        _request: RenameRequest,
        _cx: HandlerContext,
        send: Responder<()>,
    ) -> Result<Sent, FennecError> {
        Ok(send.no_content())
    }
}

register_endpoint!(ListWidgets, GetWidget, RenameWidget);

#[derive(Injectable)]
struct ShadowWidget;

#[async_trait]
impl Endpoint for ShadowWidget {
    type Request = IdRequest;
    type Response = ();

    fn configure(route: &mut RouteConfig) {
        route.get("widgets/{id}");
    }

    async fn handle(
        &self,
        _request: IdRequest,
        _cx: HandlerContext,
        send: Responder<()>,
    ) -> Result<Sent, FennecError> {
        Ok(send.ok_empty())
    }
}

#[derive(BindRequest)]
struct WidgetIdRequest {
    widget_id: i64,
}

#[derive(Injectable)]
struct DeleteWidget;

#[async_trait]
impl Endpoint for DeleteWidget {
    type Request = WidgetIdRequest;
    type Response = ();

    fn configure(route: &mut RouteConfig) {
        route.delete("/widgets/{widget_id}");
    }

    async fn handle(
        &self,
        _request: WidgetIdRequest,
        _cx: HandlerContext,
        send: Responder<()>,
    ) -> Result<Sent, FennecError> {
        Ok(send.no_content())
    }
}

#[test]
fn test_registered_endpoints_are_discovered() {
    let registered = registered_endpoints();
    assert_eq!(registered.len(), 3);

    let found = discover_endpoints().unwrap();
    let order: Vec<_> = found
        .iter()
        .map(|e| (e.descriptor.route.template(), e.descriptor.method))
        .collect();
    assert_eq!(
        order,
        vec![
            ("/widgets", HttpMethod::Get),
            ("/widgets/{id}", HttpMethod::Get),
            ("/widgets/{id}", HttpMethod::Patch),
        ]
    );
}

#[test]
fn test_descriptor_binding_modes() {
    let found = discover_endpoints().unwrap();
    let mode = |name: &str| {
        found
            .iter()
            .find(|e| e.descriptor.type_name == name)
            .map(|e| e.descriptor.binding_mode)
    };
    assert_eq!(mode("ListWidgets"), Some(BindingMode::None));
    assert_eq!(mode("GetWidget"), Some(BindingMode::RouteQuery));
    assert_eq!(mode("RenameWidget"), Some(BindingMode::Body));

    let list = found
        .iter()
        .find(|e| e.descriptor.type_name == "ListWidgets")
        .unwrap();
    assert!(list.descriptor.request.is_none());
    assert!(list.descriptor.response.is_some());
}

#[test]
fn test_repeated_registration_is_described_once() {
    let found = describe_all([
        EndpointRegistration::new::<GetWidget>(),
        EndpointRegistration::new::<GetWidget>(),
    ])
    .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_duplicate_method_and_path_is_rejected() {
    let err = describe_all([
        EndpointRegistration::new::<GetWidget>(),
        EndpointRegistration::new::<ShadowWidget>(),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::DuplicateRoute {
            method: "GET".to_string(),
            route: "/widgets/{id}".to_string(),
            first: "GetWidget".to_string(),
            second: "ShadowWidget".to_string(),
        }
    );
}

#[test]
fn test_conflicting_parameter_names_are_rejected() {
    let err = describe_all([
        EndpointRegistration::new::<GetWidget>(),
        EndpointRegistration::new::<DeleteWidget>(),
    ])
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidRoute { ref endpoint, .. } if endpoint == "DeleteWidget"));
}

#[test]
fn test_discover_mounts_registered_endpoints() {
    let app = Fennec::new(ServiceProvider::empty())
        .discover()
        .endpoint::<GetWidget>()
        .build()
        .unwrap();
    assert_eq!(app.routes().len(), 3);
    assert!(app.routes().find(HttpMethod::Patch, "/widgets/{id}").is_some());
}
