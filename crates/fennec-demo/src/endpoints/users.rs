use chrono::{DateTime, Utc};
use fennec_core::prelude::*;

use crate::models::{User, UserStatus};
use crate::store::{NewUser, UserChanges, UserFilter, UserStore};

// ── Get ────────────────────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct GetUserRequest {
    pub id: i32,
}

#[derive(Injectable)]
pub struct GetUser {
    store: Arc<UserStore>,
}

#[async_trait]
impl Endpoint for GetUser {
    type Request = GetUserRequest;
    type Response = User;

    fn configure(route: &mut RouteConfig) {
        route
            .get("/users/{id:int}")
            .tags(["Users"])
            .produces_type::<User>(200)
            .produces_problem(404);
    }

    async fn handle(
        &self,
        request: GetUserRequest,
        _cx: HandlerContext,
        send: Responder<User>,
    ) -> Result<Sent, FennecError> {
        match self.store.get(request.id) {
            Some(user) => Ok(send.ok(user)),
            None => Ok(send.not_found_message(format!("User {} does not exist", request.id))),
        }
    }
}

// ── Create ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, BindRequest)]
#[bind(json)]
#[serde(default)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    pub phone_number: Option<String>,
}

#[derive(Injectable)]
pub struct CreateUser {
    store: Arc<UserStore>,
}

#[async_trait]
impl Endpoint for CreateUser {
    type Request = CreateUserRequest;
    type Response = User;

    fn configure(route: &mut RouteConfig) {
        route
            .post("/users")
            .tags(["Users"])
            .produces_type::<User>(201)
            .produces_problem(400);
    }

    async fn handle(
        &self,
        request: CreateUserRequest,
        _cx: HandlerContext,
        send: Responder<User>,
    ) -> Result<Sent, FennecError> {
        tracing::info!(name = %request.name, email = %request.email, "creating user");
        if request.name.trim().is_empty() {
            return Ok(send.bad_request("Name is required"));
        }

        let user = self.store.create(NewUser {
            name: request.name,
            email: request.email,
            age: request.age,
            phone_number: request.phone_number,
        });
        Ok(send.created(format!("/users/{}", user.id), user))
    }
}

// ── Update ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, BindRequest)]
#[bind(json)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub id: i32,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
}

#[derive(Injectable)]
pub struct UpdateUser {
    store: Arc<UserStore>,
}

#[async_trait]
impl Endpoint for UpdateUser {
    type Request = UpdateUserRequest;
    type Response = User;

    fn configure(route: &mut RouteConfig) {
        route
            .put("/users/{id:int}")
            .tags(["Users"])
            .produces_type::<User>(200)
            .produces_problem(404);
    }

    async fn handle(
        &self,
        request: UpdateUserRequest,
        _cx: HandlerContext,
        send: Responder<User>,
    ) -> Result<Sent, FennecError> {
        let changes = UserChanges {
            name: request.name,
            email: request.email,
            age: request.age,
        };
        let user = self
            .store
            .update(request.id, changes)
            .ok_or_else(|| FennecError::NotFound(format!("User {} does not exist", request.id)))?;
        Ok(send.ok(user))
    }
}

// ── Delete ─────────────────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct DeleteUserRequest {
    pub id: i32,
}

#[derive(Injectable)]
pub struct DeleteUser {
    store: Arc<UserStore>,
}

#[async_trait]
impl Endpoint for DeleteUser {
    type Request = DeleteUserRequest;
    type Response = ();

    fn configure(route: &mut RouteConfig) {
        route
            .delete("/users/{id:int}")
            .tags(["Users"])
            .produces(204)
            .produces_problem(404);
    }

    async fn handle(
        &self,
        request: DeleteUserRequest,
        _cx: HandlerContext,
        send: Responder<()>,
    ) -> Result<Sent, FennecError> {
        tracing::info!(user_id = request.id, "deleting user");
        if self.store.delete(request.id) {
            Ok(send.no_content())
        } else {
            Ok(send.not_found())
        }
    }
}

// ── Search ─────────────────────────────────────────────────────

#[derive(Debug, BindRequest)]
pub struct SearchUsersRequest {
    pub name: Option<String>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub status: Option<UserStatus>,
    #[bind(default = "1")]
    pub page: u32,
    #[bind(default = "10")]
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct SearchUsersResponse {
    pub users: Vec<User>,
    pub total_count: usize,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Injectable)]
pub struct SearchUsers {
    store: Arc<UserStore>,
}

#[async_trait]
impl Endpoint for SearchUsers {
    type Request = SearchUsersRequest;
    type Response = SearchUsersResponse;

    fn configure(route: &mut RouteConfig) {
        route
            .get("/users/search")
            .tags(["Users"])
            .produces_type::<SearchUsersResponse>(200)
            .produces_problem(400);
    }

    async fn handle(
        &self,
        request: SearchUsersRequest,
        _cx: HandlerContext,
        send: Responder<SearchUsersResponse>,
    ) -> Result<Sent, FennecError> {
        if request.page == 0 || request.page_size == 0 || request.page_size > 100 {
            let mut errors = BindingError::new();
            if request.page == 0 {
                errors.add("page", "Page numbers start at 1");
            }
            if request.page_size == 0 || request.page_size > 100 {
                errors.add("page_size", "Page size must be between 1 and 100");
            }
            return Ok(send.bad_request_problem(errors));
        }

        let filter = UserFilter {
            name: request.name,
            min_age: request.min_age,
            max_age: request.max_age,
            status: request.status,
        };
        let (users, total_count) = self.store.search(&filter, request.page, request.page_size);
        Ok(send.ok(SearchUsersResponse {
            users,
            total_count,
            page: request.page,
            page_size: request.page_size,
        }))
    }
}

// ── Status ─────────────────────────────────────────────────────

/// `PATCH /users/{id}/status`: `id` comes from the route, the rest from
/// the JSON body.
#[derive(Debug, Default, Deserialize, BindRequest)]
#[bind(json)]
#[serde(default)]
pub struct UpdateUserStatusRequest {
    pub id: i32,
    pub status: Option<UserStatus>,
    pub reason: Option<String>,
    pub effective_date: Option<DateTime<Utc>>,
}

#[derive(Injectable)]
pub struct UpdateUserStatus {
    store: Arc<UserStore>,
}

#[async_trait]
impl Endpoint for UpdateUserStatus {
    type Request = UpdateUserStatusRequest;
    type Response = User;

    fn configure(route: &mut RouteConfig) {
        route
            .patch("/users/{id:int}/status")
            .tags(["Users"])
            .produces_type::<User>(200)
            .produces_problem(400)
            .produces_problem(404);
    }

    async fn handle(
        &self,
        request: UpdateUserStatusRequest,
        _cx: HandlerContext,
        send: Responder<User>,
    ) -> Result<Sent, FennecError> {
        let Some(status) = request.status else {
            return Ok(send.bad_request_problem(BindingError::single(
                "status",
                "A value for 'status' is required.",
            )));
        };
        tracing::info!(
            user_id = request.id,
            ?status,
            reason = request.reason.as_deref().unwrap_or("-"),
            effective = ?request.effective_date,
            "updating user status"
        );

        match self.store.set_status(request.id, status, request.reason) {
            Some(user) => Ok(send.ok(user)),
            None => Ok(send.not_found()),
        }
    }
}
