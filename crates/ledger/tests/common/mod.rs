//! In-process fake of the Trackwise REST API, served over real HTTP.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use api_types::{
    Money, TransactionKind,
    category::{CategoryView, CategoryWrite},
    date::parse_calendar_date,
    dashboard::{OverviewResponse, OverviewUser, TotalsView},
    transaction::{CategoryRef, EmbeddedCategory, TransactionView, TransactionWrite},
    user::{LoginRequest, RegisterRequest},
};
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use ledger::{
    ApiClient, FileCredentialStore, HttpTransport, IDEMPOTENCY_HEADER, MemoryCredentialStore,
    Navigator, Route, Session,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "token-ada";

#[derive(Default)]
struct Db {
    categories: Vec<CategoryView>,
    /// Newest first.
    transactions: Vec<TransactionView>,
    idempotency: HashMap<String, String>,
    next_id: u64,
    revoked: bool,
}

impl Db {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn category(&self, id: &str) -> Option<&CategoryView> {
        self.categories.iter().find(|category| category.id == id)
    }
}

#[derive(Clone, Default)]
pub struct FakeApi {
    db: Arc<Mutex<Db>>,
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

impl FakeApi {
    /// One default category per kind, no transactions.
    pub fn seeded() -> Self {
        let api = Self::default();
        {
            let mut db = api.db();
            let general = CategoryView {
                id: db.id("c"),
                title: "General".to_string(),
                kind: TransactionKind::Expense,
                color: "#64748b".to_string(),
                is_default: true,
            };
            let salary = CategoryView {
                id: db.id("c"),
                title: "Salary".to_string(),
                kind: TransactionKind::Income,
                color: "#22c55e".to_string(),
                is_default: true,
            };
            db.categories = vec![general, salary];
        }
        api
    }

    fn db(&self) -> MutexGuard<'_, Db> {
        self.db.lock().unwrap()
    }

    /// Every bearer token is refused from now on.
    pub fn revoke(&self) {
        self.db().revoked = true;
    }

    pub fn categories(&self) -> Vec<CategoryView> {
        self.db().categories.clone()
    }

    pub fn transactions(&self) -> Vec<TransactionView> {
        self.db().transactions.clone()
    }

    /// Serves the API under `/api` on an ephemeral port and returns its base
    /// URL. Without `overview` the dashboard endpoint does not exist.
    pub async fn spawn(self, overview: bool) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, self.router(overview)).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn router(self, overview: bool) -> Router {
        let mut protected = Router::new()
            .route("/categories", get(list_categories).post(create_category))
            .route(
                "/categories/{id}",
                axum::routing::put(update_category).delete(delete_category),
            )
            .route("/transactions", get(list_transactions))
            .route("/expenses", post(create_expense))
            .route(
                "/expenses/{id}",
                get(get_expense).put(update_expense).delete(delete_expense),
            )
            .route("/income", post(create_income))
            .route(
                "/income/{id}",
                get(get_income).put(update_income).delete(delete_income),
            );
        if overview {
            protected = protected.route("/dashboard/overview", get(dashboard));
        }
        let protected =
            protected.route_layer(middleware::from_fn_with_state(self.clone(), auth));

        let api = Router::new()
            .route("/users/login", post(login))
            .route("/users/register", post(register))
            .merge(protected)
            .with_state(self);
        Router::new().nest("/api", api)
    }
}

/// Real client wired to `base_url`, with an optional stored token.
pub fn client(
    base_url: &str,
    token: Option<&str>,
) -> (ApiClient<HttpTransport>, UnboundedReceiver<Route>) {
    let (navigator, rx) = Navigator::channel();
    let store = match token {
        Some(token) => MemoryCredentialStore::with_value(token),
        None => MemoryCredentialStore::default(),
    };
    let transport = HttpTransport::new(base_url).unwrap();
    (ApiClient::new(transport, Session::new(store, navigator)), rx)
}

/// Same as [`client`] but persisting the token in a JSON file.
pub fn file_client(
    base_url: &str,
    store: FileCredentialStore,
) -> (ApiClient<HttpTransport>, UnboundedReceiver<Route>) {
    let (navigator, rx) = Navigator::channel();
    let transport = HttpTransport::new(base_url).unwrap();
    (ApiClient::new(transport, Session::new(store, navigator)), rx)
}

async fn auth(
    State(api): State<FakeApi>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Response {
    let revoked = api.db().revoked;
    let valid = bearer.is_some_and(|TypedHeader(header)| header.token() == TOKEN);
    if !valid || revoked {
        return error(StatusCode::UNAUTHORIZED, "Not authorized, token failed");
    }
    next.run(request).await
}

async fn login(Json(body): Json<LoginRequest>) -> Response {
    if body.email != EMAIL || body.password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    Json(json!({
        "token": TOKEN,
        "user": {"_id": "u1", "name": "Ada", "email": EMAIL}
    }))
    .into_response()
}

async fn register(Json(body): Json<RegisterRequest>) -> Response {
    if body.email == EMAIL {
        return error(StatusCode::BAD_REQUEST, "User already exists");
    }
    (StatusCode::CREATED, Json(json!({"message": "User registered"}))).into_response()
}

#[derive(Deserialize)]
struct KindParam {
    #[serde(rename = "type")]
    kind: Option<TransactionKind>,
}

async fn list_categories(
    State(api): State<FakeApi>,
    Query(params): Query<KindParam>,
) -> Response {
    let categories: Vec<CategoryView> = api
        .db()
        .categories
        .iter()
        .filter(|category| params.kind.is_none_or(|kind| category.kind == kind))
        .cloned()
        .collect();
    Json(categories).into_response()
}

async fn create_category(
    State(api): State<FakeApi>,
    Json(body): Json<CategoryWrite>,
) -> Response {
    let mut db = api.db();
    let category = CategoryView {
        id: db.id("c"),
        title: body.title,
        kind: body.kind,
        color: body.color,
        is_default: false,
    };
    db.categories.push(category.clone());
    (StatusCode::CREATED, Json(category)).into_response()
}

async fn update_category(
    State(api): State<FakeApi>,
    Path(id): Path<String>,
    Json(body): Json<CategoryWrite>,
) -> Response {
    let mut db = api.db();
    let Some(category) = db.categories.iter_mut().find(|category| category.id == id) else {
        return error(StatusCode::NOT_FOUND, "Category not found");
    };
    if category.is_default {
        return error(StatusCode::FORBIDDEN, "Default categories are read-only");
    }
    category.title = body.title;
    category.kind = body.kind;
    category.color = body.color;
    Json(category.clone()).into_response()
}

async fn delete_category(State(api): State<FakeApi>, Path(id): Path<String>) -> Response {
    let mut db = api.db();
    let before = db.categories.len();
    db.categories.retain(|category| category.id != id || category.is_default);
    if db.categories.len() == before {
        return error(StatusCode::NOT_FOUND, "Category not found");
    }
    Json(json!({"message": "Category removed"})).into_response()
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(rename = "type")]
    kind: Option<TransactionKind>,
    date: Option<String>,
    month: Option<String>,
    limit: Option<usize>,
}

async fn list_transactions(
    State(api): State<FakeApi>,
    Query(params): Query<ListParams>,
) -> Response {
    let day = params.date.as_deref().and_then(parse_calendar_date);
    let transactions: Vec<TransactionView> = api
        .db()
        .transactions
        .iter()
        .filter(|tx| params.kind.is_none_or(|kind| tx.kind == Some(kind)))
        .filter(|tx| day.is_none_or(|day| tx.date == Some(day)))
        .filter(|tx| {
            params.month.as_deref().is_none_or(|month| {
                tx.date
                    .is_some_and(|date| date.format("%Y-%m").to_string() == month)
            })
        })
        .take(params.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Json(transactions).into_response()
}

fn populate(
    db: &Db,
    kind: TransactionKind,
    body: &TransactionWrite,
) -> Result<CategoryRef, Response> {
    if !body.amount.is_positive() {
        return Err(error(StatusCode::BAD_REQUEST, "Amount must be positive"));
    }
    match db.category(&body.category) {
        Some(category) if category.kind == kind => Ok(CategoryRef::Embedded(EmbeddedCategory {
            id: category.id.clone(),
            title: Some(category.title.clone()),
            color: Some(category.color.clone()),
            kind: Some(category.kind),
        })),
        _ => Err(error(StatusCode::BAD_REQUEST, "Invalid category")),
    }
}

fn create(
    api: &FakeApi,
    kind: TransactionKind,
    headers: &HeaderMap,
    body: TransactionWrite,
) -> Response {
    let mut db = api.db();
    let key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    if let Some(existing) = key.as_ref().and_then(|key| db.idempotency.get(key)) {
        let existing = existing.clone();
        if let Some(tx) = db.transactions.iter().find(|tx| tx.id == existing) {
            return (StatusCode::CREATED, Json(tx.clone())).into_response();
        }
    }

    let category = match populate(&db, kind, &body) {
        Ok(category) => category,
        Err(res) => return res,
    };
    let tx = TransactionView {
        id: db.id("t"),
        title: body.title,
        amount: body.amount,
        category: Some(category),
        date: Some(body.date.unwrap_or_else(|| chrono::Utc::now().date_naive())),
        note: body.note,
        kind: Some(kind),
    };
    if let Some(key) = key {
        db.idempotency.insert(key, tx.id.clone());
    }
    db.transactions.insert(0, tx.clone());
    (StatusCode::CREATED, Json(tx)).into_response()
}

fn fetch(api: &FakeApi, kind: TransactionKind, id: &str) -> Response {
    match api
        .db()
        .transactions
        .iter()
        .find(|tx| tx.id == id && tx.kind == Some(kind))
    {
        // Type-specific endpoints do not report the type.
        Some(tx) => Json(TransactionView {
            kind: None,
            ..tx.clone()
        })
        .into_response(),
        None => error(StatusCode::NOT_FOUND, "Transaction not found"),
    }
}

fn update(api: &FakeApi, kind: TransactionKind, id: &str, body: TransactionWrite) -> Response {
    let mut db = api.db();
    let category = match populate(&db, kind, &body) {
        Ok(category) => category,
        Err(res) => return res,
    };
    let Some(tx) = db
        .transactions
        .iter_mut()
        .find(|tx| tx.id == id && tx.kind == Some(kind))
    else {
        return error(StatusCode::NOT_FOUND, "Transaction not found");
    };
    tx.title = body.title;
    tx.amount = body.amount;
    tx.category = Some(category);
    if let Some(date) = body.date {
        tx.date = Some(date);
    }
    tx.note = body.note;
    Json(tx.clone()).into_response()
}

fn remove(api: &FakeApi, kind: TransactionKind, id: &str) -> Response {
    let mut db = api.db();
    let before = db.transactions.len();
    db.transactions
        .retain(|tx| !(tx.id == id && tx.kind == Some(kind)));
    if db.transactions.len() == before {
        return error(StatusCode::NOT_FOUND, "Transaction not found");
    }
    Json(json!({"message": "Transaction removed"})).into_response()
}

async fn create_expense(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<TransactionWrite>,
) -> Response {
    create(&api, TransactionKind::Expense, &headers, body)
}

async fn create_income(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<TransactionWrite>,
) -> Response {
    create(&api, TransactionKind::Income, &headers, body)
}

async fn get_expense(State(api): State<FakeApi>, Path(id): Path<String>) -> Response {
    fetch(&api, TransactionKind::Expense, &id)
}

async fn get_income(State(api): State<FakeApi>, Path(id): Path<String>) -> Response {
    fetch(&api, TransactionKind::Income, &id)
}

async fn update_expense(
    State(api): State<FakeApi>,
    Path(id): Path<String>,
    Json(body): Json<TransactionWrite>,
) -> Response {
    update(&api, TransactionKind::Expense, &id, body)
}

async fn update_income(
    State(api): State<FakeApi>,
    Path(id): Path<String>,
    Json(body): Json<TransactionWrite>,
) -> Response {
    update(&api, TransactionKind::Income, &id, body)
}

async fn delete_expense(State(api): State<FakeApi>, Path(id): Path<String>) -> Response {
    remove(&api, TransactionKind::Expense, &id)
}

async fn delete_income(State(api): State<FakeApi>, Path(id): Path<String>) -> Response {
    remove(&api, TransactionKind::Income, &id)
}

async fn dashboard(State(api): State<FakeApi>) -> Response {
    let db = api.db();
    let sum = |kind: TransactionKind| -> i64 {
        db.transactions
            .iter()
            .filter(|tx| tx.kind == Some(kind))
            .map(|tx| tx.amount.minor())
            .sum()
    };
    let (income, expense) = (sum(TransactionKind::Income), sum(TransactionKind::Expense));
    Json(OverviewResponse {
        user: Some(OverviewUser {
            name: "Ada".to_string(),
        }),
        totals: TotalsView {
            income: Money::from_minor(income),
            expense: Money::from_minor(expense),
            balance: Some(Money::from_minor(income - expense)),
        },
        recent: db.transactions.iter().take(5).cloned().collect(),
    })
    .into_response()
}
