//! Plain-text views printed to stdout.
use api_types::{
    Accent, Money, TransactionKind, category::CategoryView, transaction::TransactionView,
};
use crossterm::style::{Color, Stylize};
use ledger::{CategoryAction, Overview, Route, category_actions};

fn accented(accent: Accent, text: String) -> String {
    match accent {
        Accent::Negative => text.red().to_string(),
        Accent::Positive => text.green().to_string(),
    }
}

fn signed(kind: TransactionKind, amount: Money) -> String {
    accented(kind.accent(), format!("{}{amount}", kind.sign()))
}

/// `#rrggbb` to a terminal colour; anything else renders uncoloured.
fn swatch(hex: &str) -> String {
    let rgb = hex
        .strip_prefix('#')
        .filter(|digits| digits.len() == 6)
        .and_then(|digits| u32::from_str_radix(digits, 16).ok());
    match rgb {
        Some(rgb) => "●"
            .with(Color::Rgb {
                r: (rgb >> 16) as u8,
                g: (rgb >> 8) as u8,
                b: rgb as u8,
            })
            .to_string(),
        None => "●".to_string(),
    }
}

fn line(tx: &TransactionView) -> String {
    let date = tx
        .date
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    let category = tx
        .category
        .as_ref()
        .map(|category| category.title().unwrap_or(category.id()).to_string())
        .unwrap_or_default();
    let amount = match tx.kind {
        Some(kind) => signed(kind, tx.amount),
        None => tx.amount.to_string(),
    };
    let mut line = format!("{date}  {:<24} {:<14} {amount:>12}", tx.title, category);
    if let Some(note) = tx.note.as_deref().filter(|note| !note.is_empty()) {
        line.push_str(&format!("  ({note})"));
    }
    format!("{line}  [{}]", tx.id.as_str().dark_grey())
}

pub fn overview(overview: &Overview) {
    if let Some(name) = &overview.user_name {
        println!("{}", format!("Welcome back, {name}").bold());
    }
    let totals = overview.totals;
    println!(
        "Income   {}",
        accented(Accent::Positive, totals.income.to_string())
    );
    println!(
        "Expenses {}",
        accented(Accent::Negative, totals.expense.to_string())
    );
    let balance_accent = if totals.balance.minor() < 0 {
        Accent::Negative
    } else {
        Accent::Positive
    };
    println!(
        "Balance  {}",
        accented(balance_accent, totals.balance.to_string())
    );

    println!();
    if overview.recent.is_empty() {
        println!("No transactions yet.");
        return;
    }
    println!("{}", "Recent".bold());
    for tx in &overview.recent {
        println!("{}", line(tx));
    }
}

pub fn categories(categories: &[CategoryView]) {
    if categories.is_empty() {
        println!("No categories.");
        return;
    }
    for category in categories {
        let actions = category_actions(category);
        let tag = if actions.contains(&CategoryAction::Delete) {
            String::new()
        } else {
            " (default)".dark_grey().to_string()
        };
        println!(
            "{} {:<24} {:<8}{tag}  [{}]",
            swatch(&category.color),
            category.title,
            category.kind.label(),
            category.id.as_str().dark_grey()
        );
    }
}

pub fn transactions(transactions: &[TransactionView]) {
    if transactions.is_empty() {
        println!("No transactions match.");
        return;
    }
    for tx in transactions {
        println!("{}", line(tx));
    }
}

pub fn saved(heading: &str, tx: &TransactionView, recent: &[TransactionView]) {
    println!("{} {}", heading.bold(), line(tx));
    if recent.is_empty() {
        return;
    }
    println!();
    println!("{}", "Recent".bold());
    for tx in recent {
        println!("{}", line(tx));
    }
}

/// What the user should do after the core asked for a view change.
pub fn route_hint(route: &Route) {
    match route {
        Route::Login => eprintln!(
            "{}",
            "Not logged in or session expired. Run `trackwise login`.".yellow()
        ),
        Route::Categories => eprintln!(
            "{}",
            "Add a category first: `trackwise categories add <title> --type <kind>`.".yellow()
        ),
        other => tracing::debug!("view {} requested", other.path()),
    }
}

pub fn error(err: &crate::error::AppError) {
    eprintln!("{} {err}", "error:".red().bold());
}
