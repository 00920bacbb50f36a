//! services/client/src/cli.rs
//!
//! Command-line front end over the session store and the history browser.

use clap::{Parser, Subcommand};
use spamwall_core::{FilterType, HistoryBrowser, Page, Session, SessionStatus};

use crate::app::AppState;
use crate::error::ClientError;

const PREVIEW_CHARS: usize = 150;

#[derive(Debug, Parser)]
#[command(name = "spamwall", about = "Sign in to the spam classifier and browse your analysis history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the stored session with the backend.
    Status,
    /// Sign in with an existing account.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show one page of past analyses.
    History {
        #[arg(long, default_value = "all")]
        filter: FilterType,
        #[arg(long, default_value = "")]
        search: String,
        /// One-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Ask for a password reset email.
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with a reset token.
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Follow sign-ins and sign-outs from other processes until interrupted.
    Watch,
    /// Check whether the backend is reachable.
    Health,
}

/// Runs one command against the shared state.
pub async fn run(command: Command, state: &AppState) -> Result<(), ClientError> {
    match command {
        Command::Status => {
            let session = state.session.initialize().await;
            println!("{}", describe(&session));
        }
        Command::Login { email, password } => {
            let user = state.session.login(&email, &password).await?;
            println!("Signed in as {} (id {})", user.email, user.id);
        }
        Command::Register { email, password } => {
            let user = state.session.register(&email, &password).await?;
            println!("Account created. Signed in as {} (id {})", user.email, user.id);
        }
        Command::Logout => {
            state.session.logout();
            println!("Signed out");
        }
        Command::History {
            filter,
            search,
            page,
        } => {
            let session = state.session.initialize().await;
            if !session.is_authenticated() {
                println!("{}", describe(&session));
                return Ok(());
            }
            let mut browser = state.history_browser();
            browser.refresh().await?;
            browser.set_filter(filter);
            browser.set_query(search);
            browser.set_page(page.saturating_sub(1));
            print_history(&mut browser);
        }
        Command::ForgotPassword { email } => {
            let message = state.session.forgot_password(&email).await?;
            println!("{}", message);
        }
        Command::ResetPassword {
            token,
            password,
            confirm,
        } => {
            let message = state.session.reset_password(&token, &password, &confirm).await?;
            println!("{}", message);
        }
        Command::Watch => watch(state).await?,
        Command::Health => {
            if state.backend.probe_server().await {
                println!("Backend at {} is reachable", state.backend.base_url());
            } else {
                println!("Backend at {} is not reachable", state.backend.base_url());
            }
        }
    }
    Ok(())
}

async fn watch(state: &AppState) -> Result<(), ClientError> {
    let mut changes = state.session.subscribe();
    let watchers = state.spawn_watchers();
    let session = state.session.initialize().await;
    println!("{}", describe(&session));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = changes.borrow_and_update().clone();
                if session.status() != SessionStatus::Verifying {
                    println!("{}", describe(&session));
                }
            }
        }
    }

    state.shutdown.cancel();
    for watcher in watchers {
        watcher.await?;
    }
    Ok(())
}

fn describe(session: &Session) -> String {
    match (session.status(), session.user()) {
        (SessionStatus::Valid, Some(user)) => format!("Signed in as {} (id {})", user.email, user.id),
        (SessionStatus::Verifying, _) => "Checking session...".to_string(),
        (SessionStatus::Unverified, _) => "Session not checked yet".to_string(),
        _ => "Not signed in".to_string(),
    }
}

fn print_history(browser: &mut HistoryBrowser) {
    let counts = browser.counts();
    println!(
        "All ({}) | Spam ({}) | Ham ({})",
        counts.all, counts.spam, counts.ham
    );

    if let Some(empty) = browser.empty_state() {
        println!("{}", empty.message());
        return;
    }

    let page = browser.current_page();
    for item in page.items() {
        println!(
            "[{}] {}  {}",
            item.label(),
            item.display_timestamp(),
            item.preview(PREVIEW_CHARS)
        );
    }
    println!("{}", footer(&page));
}

fn footer(page: &Page) -> String {
    format!(
        "Page {} of {} ({} total)",
        page.window.number(),
        page.window.total_pages,
        page.window.total_items
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use spamwall_core::{HistoryItem, UserIdentity};
    use std::sync::Arc;

    #[test]
    fn parses_history_flags() {
        let cli = Cli::try_parse_from([
            "spamwall", "history", "--filter", "spam", "--search", "prize", "--page", "2",
        ])
        .unwrap();
        match cli.command {
            Command::History {
                filter,
                search,
                page,
            } => {
                assert_eq!(filter, FilterType::Spam);
                assert_eq!(search, "prize");
                assert_eq!(page, 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_filter() {
        assert!(Cli::try_parse_from(["spamwall", "history", "--filter", "junk"]).is_err());
    }

    #[test]
    fn describes_sessions() {
        let user = UserIdentity {
            id: 3,
            email: "ada@example.com".to_string(),
        };
        assert_eq!(
            describe(&Session::valid(user)),
            "Signed in as ada@example.com (id 3)"
        );
        assert_eq!(describe(&Session::invalid()), "Not signed in");
    }

    #[test]
    fn footer_uses_one_based_numbers() {
        let view: Arc<[HistoryItem]> = (0..25)
            .map(|i| HistoryItem::new(format!("m{}", i), false, ""))
            .collect::<Vec<_>>()
            .into();
        let page = Page::new(view, 2, 10);
        assert_eq!(footer(&page), "Page 3 of 3 (25 total)");
    }
}
