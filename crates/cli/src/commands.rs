use api_types::TransactionKind;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use ledger::{
    Aggregator, ApiClient, Auth, CategoryDraft, CategoryStore, Deletion, FileCredentialStore,
    FormController, HttpTransport, LedgerStore, Navigator, Session, YearMonth,
};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    prompt::{self, Prompt},
    render,
};

type Api = ApiClient<HttpTransport>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and remember the session.
    Login {
        #[arg(long)]
        email: String,
    },
    /// Create an account.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session.
    Logout,
    /// Totals, balance and the latest transactions.
    Dashboard,
    Categories {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    Expense {
        #[command(subcommand)]
        command: EntryCommand,
    },
    Income {
        #[command(subcommand)]
        command: EntryCommand,
    },
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    List {
        #[arg(long = "type")]
        kind: Option<TransactionKind>,
    },
    Add {
        title: String,
        #[arg(long = "type")]
        kind: TransactionKind,
        #[arg(long)]
        color: Option<String>,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "type")]
        kind: Option<TransactionKind>,
        #[arg(long)]
        color: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct EntryFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    amount: Option<String>,
    /// Category id or title.
    #[arg(long)]
    category: Option<String>,
    /// YYYY-MM-DD; defaults to today on the server.
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    note: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    Add {
        #[command(flatten)]
        fields: EntryFields,
    },
    Edit {
        id: String,
        #[command(flatten)]
        fields: EntryFields,
    },
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    List {
        #[arg(long = "type")]
        kind: Option<TransactionKind>,
        /// Single day, YYYY-MM-DD.
        #[arg(long, conflicts_with = "month")]
        date: Option<NaiveDate>,
        /// Whole month, YYYY-MM.
        #[arg(long)]
        month: Option<String>,
    },
    Delete {
        #[arg(value_name = "TYPE")]
        kind: TransactionKind,
        id: String,
    },
}

/// Runs one command and reports the views the core asked for.
pub async fn run(command: Command, config: &AppConfig, assume_yes: bool) -> Result<()> {
    let (navigator, mut routes) = Navigator::channel();
    let session = Session::new(FileCredentialStore::new(&config.session_path), navigator);
    let api = ApiClient::new(HttpTransport::new(&config.base_url)?, session);
    let confirm = Prompt { assume_yes };

    let outcome = dispatch(command, api, &confirm).await;
    while let Ok(route) = routes.try_recv() {
        render::route_hint(&route);
    }
    outcome
}

async fn dispatch(command: Command, api: Api, confirm: &Prompt) -> Result<()> {
    match command {
        Command::Login { email } => {
            let password = prompt::password("Password: ")?;
            let user = Auth::new(api).login(&email, &password).await?;
            match user {
                Some(user) => println!("Logged in as {}", user.name),
                None => println!("Logged in"),
            }
        }
        Command::Register { name, email } => {
            let password = prompt::password("Password: ")?;
            Auth::new(api).register(&name, &email, &password).await?;
            println!("Account created. Run `trackwise login --email {email}`.");
        }
        Command::Logout => {
            Auth::new(api).logout();
            println!("Logged out");
        }
        Command::Dashboard => {
            let overview = Aggregator::new(api).overview().await?;
            render::overview(&overview);
        }
        Command::Categories { command } => categories(command, api, confirm).await?,
        Command::Expense { command } => entry(TransactionKind::Expense, command, api).await?,
        Command::Income { command } => entry(TransactionKind::Income, command, api).await?,
        Command::Ledger { command } => ledger(command, api, confirm).await?,
    }
    Ok(())
}

async fn categories(command: CategoryCommand, api: Api, confirm: &Prompt) -> Result<()> {
    match command {
        CategoryCommand::List { kind } => {
            let mut store = CategoryStore::new(api, kind);
            render::categories(store.refresh().await?);
        }
        CategoryCommand::Add { title, kind, color } => {
            let mut draft = CategoryDraft::new(title, kind);
            if let Some(color) = color {
                draft = draft.with_color(color);
            }
            let mut store = CategoryStore::new(api, None);
            store.create(&draft).await?;
            render::categories(store.items());
        }
        CategoryCommand::Edit {
            id,
            title,
            kind,
            color,
        } => {
            let mut store = CategoryStore::new(api, None);
            store.refresh().await?;
            let current = store
                .get(&id)
                .ok_or_else(|| AppError::Input(format!("no category with id {id}")))?;
            let mut draft = CategoryDraft::from_view(current);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(kind) = kind {
                draft.kind = kind;
            }
            if let Some(color) = color {
                draft.color = color;
            }
            store.update(&id, &draft).await?;
            render::categories(store.items());
        }
        CategoryCommand::Delete { id } => {
            let mut store = CategoryStore::new(api, None);
            store.refresh().await?;
            match store.delete(&id, confirm).await? {
                Deletion::Deleted => println!("Category deleted"),
                Deletion::Cancelled => println!("Nothing deleted"),
            }
        }
    }
    Ok(())
}

async fn entry(kind: TransactionKind, command: EntryCommand, api: Api) -> Result<()> {
    let navigator = api.session().navigator().clone();
    let mut form = FormController::new(api, kind);
    let (edit_id, fields) = match command {
        EntryCommand::Add { fields } => (None, fields),
        EntryCommand::Edit { id, fields } => (Some(id), fields),
    };
    form.enter(edit_id).await?;

    if !form.can_submit() {
        if let Some(route) = form.call_to_action() {
            navigator.navigate(route);
        }
        return Err(AppError::Input(format!("no {kind} categories yet")));
    }

    let category = match fields.category.as_deref() {
        Some(wanted) => Some(
            form.categories()
                .iter()
                .find(|c| c.id == wanted || c.title.eq_ignore_ascii_case(wanted))
                .map(|c| c.id.clone())
                .ok_or_else(|| AppError::Input(format!("no {kind} category named {wanted}")))?,
        ),
        None => None,
    };
    form.edit_fields(|draft| {
        if let Some(title) = fields.title {
            draft.title = title;
        }
        if let Some(amount) = fields.amount {
            draft.amount = amount;
        }
        if let Some(category) = category {
            draft.category = category;
        }
        if let Some(date) = fields.date {
            draft.date = date;
        }
        if let Some(note) = fields.note {
            draft.note = note;
        }
    });

    let heading = form.heading();
    let tx = form.submit().await?;
    render::saved(&heading, &tx, form.recent());
    Ok(())
}

async fn ledger(command: LedgerCommand, api: Api, confirm: &Prompt) -> Result<()> {
    match command {
        LedgerCommand::List { kind, date, month } => {
            let mut store = LedgerStore::new(api);
            let month = month
                .as_deref()
                .map(str::parse::<YearMonth>)
                .transpose()?;
            let query = store.query_mut();
            query.set_kind(kind);
            query.set_day(date);
            query.set_month(month);
            render::transactions(store.refresh().await?);
        }
        LedgerCommand::Delete { kind, id } => {
            let mut store = LedgerStore::new(api);
            match store.delete(kind, &id, confirm).await? {
                Deletion::Deleted => println!("{} deleted", kind.label()),
                Deletion::Cancelled => println!("Nothing deleted"),
            }
        }
    }
    Ok(())
}
