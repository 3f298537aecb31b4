use api_types::TransactionKind;
use tokio::sync::mpsc;

/// Views the core can ask the front end to show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Transactions,
    Categories,
    NewEntry(TransactionKind),
    EditEntry { kind: TransactionKind, id: String },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".to_string(),
            Self::Dashboard => "/dashboard".to_string(),
            Self::Transactions => "/transactions".to_string(),
            Self::Categories => "/categories".to_string(),
            Self::NewEntry(kind) => format!("/add-{}", kind.as_str()),
            Self::EditEntry { kind, id } => format!("/add-{}?edit={id}", kind.as_str()),
        }
    }

    /// Edit identifier carried by the navigation context, if any.
    pub fn edit_id(&self) -> Option<&str> {
        match self {
            Self::EditEntry { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Outgoing side of the router.
///
/// The router itself lives in the front end; the core only emits the routes
/// it wants shown. Sends to a closed view are dropped.
#[derive(Clone, Debug)]
pub struct Navigator {
    tx: mpsc::UnboundedSender<Route>,
}

impl Navigator {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn navigate(&self, route: Route) {
        tracing::debug!("navigate to {}", route.path());
        if self.tx.send(route).is_err() {
            tracing::debug!("navigation dropped, no router attached");
        }
    }
}
