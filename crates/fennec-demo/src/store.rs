//! In-memory data behind the demo endpoints.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::models::{Product, User, UserStatus};

/// Fields accepted when creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    pub phone_number: Option<String>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
}

/// Search criteria for [`UserStore::search`].
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub name: Option<String>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub status: Option<UserStatus>,
}

impl UserFilter {
    fn matches(&self, user: &User) -> bool {
        let name_ok = self.name.as_ref().is_none_or(|needle| {
            user.name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        let age = user.age.unwrap_or(0);
        name_ok
            && self.min_age.is_none_or(|min| age >= min)
            && self.max_age.is_none_or(|max| age <= max)
            && self.status.is_none_or(|status| user.status == status)
    }
}

struct Users {
    next_id: i32,
    rows: BTreeMap<i32, User>,
}

/// Users keyed by id.
pub struct UserStore {
    inner: RwLock<Users>,
}

impl Default for UserStore {
    fn default() -> Self {
        UserStore {
            inner: RwLock::new(Users {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl UserStore {
    /// A store pre-filled with a few users.
    pub fn seeded() -> Self {
        let store = UserStore::default();
        for (name, age) in [("Ada Lovelace", 36), ("Grace Hopper", 45), ("Alan Turing", 41)] {
            let email = format!(
                "{}@example.com",
                name.split(' ').next().unwrap_or(name).to_lowercase()
            );
            store.create(NewUser {
                name: name.to_string(),
                email,
                age: Some(age),
                phone_number: None,
            });
        }
        store
    }

    pub fn get(&self, id: i32) -> Option<User> {
        self.read(|users| users.rows.get(&id).cloned())
    }

    pub fn create(&self, new: NewUser) -> User {
        self.write(|users| {
            let id = users.next_id;
            users.next_id += 1;
            let now = Utc::now();
            let user = User {
                id,
                name: new.name,
                email: new.email,
                age: new.age,
                phone_number: new.phone_number,
                status: UserStatus::Active,
                status_reason: None,
                created_at: now,
                updated_at: now,
            };
            users.rows.insert(id, user.clone());
            user
        })
    }

    pub fn update(&self, id: i32, changes: UserChanges) -> Option<User> {
        self.write(|users| {
            let user = users.rows.get_mut(&id)?;
            if let Some(name) = changes.name {
                user.name = name;
            }
            if let Some(email) = changes.email {
                user.email = email;
            }
            if changes.age.is_some() {
                user.age = changes.age;
            }
            user.updated_at = Utc::now();
            Some(user.clone())
        })
    }

    pub fn set_status(&self, id: i32, status: UserStatus, reason: Option<String>) -> Option<User> {
        self.write(|users| {
            let user = users.rows.get_mut(&id)?;
            user.status = status;
            user.status_reason = reason;
            user.updated_at = Utc::now();
            Some(user.clone())
        })
    }

    pub fn delete(&self, id: i32) -> bool {
        self.write(|users| users.rows.remove(&id).is_some())
    }

    /// Matching users in id order, with the total match count.
    pub fn search(&self, filter: &UserFilter, page: u32, page_size: u32) -> (Vec<User>, usize) {
        self.read(|users| {
            let matching: Vec<&User> = users.rows.values().filter(|u| filter.matches(u)).collect();
            let skip = page.saturating_sub(1) as usize * page_size as usize;
            let found = matching
                .iter()
                .skip(skip)
                .take(page_size as usize)
                .map(|u| (*u).clone())
                .collect();
            (found, matching.len())
        })
    }

    fn read<R>(&self, f: impl FnOnce(&Users) -> R) -> R {
        f(&*self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<R>(&self, f: impl FnOnce(&mut Users) -> R) -> R {
        f(&mut *self.inner.write().unwrap_or_else(PoisonError::into_inner))
    }
}

/// The product list.
pub struct ProductCatalog {
    products: RwLock<Vec<Product>>,
}

impl ProductCatalog {
    pub fn seeded() -> Self {
        let product = |id, name: &str, price, category: &str, in_stock| Product {
            id,
            name: name.to_string(),
            price,
            category: category.to_string(),
            in_stock,
        };
        ProductCatalog {
            products: RwLock::new(vec![
                product(1, "Product 1", 10.99, "Electronics", true),
                product(2, "Product 2", 20.99, "Books", true),
                product(3, "Product 3", 30.99, "Clothing", false),
            ]),
        }
    }

    pub fn list(&self, category: Option<&str>, in_stock: Option<bool>) -> Vec<Product> {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
            .filter(|p| in_stock.is_none_or(|s| p.in_stock == s))
            .cloned()
            .collect()
    }

    pub fn remove(&self, id: i32) -> Option<Product> {
        let mut products = self
            .products
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let index = products.iter().position(|p| p.id == id)?;
        Some(products.remove(index))
    }
}

/// Process facts reported by the health endpoint.
pub struct ServerInfo {
    started: Instant,
    pub version: &'static str,
}

impl ServerInfo {
    pub fn new() -> Self {
        ServerInfo {
            started: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new()
    }
}
