use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use tracing::{error, info, warn};

use crate::{
    api, auth,
    documents::{self, poller::DocumentSource, DocumentPoller, DocumentView, PollEvent, UploadFile},
    error::ClientError,
    navigation::Navigation,
    profile::{self, Tier},
    render,
    session::Session,
    state::AppState,
};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        email: String,
        #[arg(long, env = "CC_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        email: String,
        #[arg(long, env = "CC_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the local session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Upload a contract for analysis (PDF, DOC, DOCX or TXT)
    Upload {
        path: PathBuf,
        /// Declared MIME type, otherwise taken from the extension
        #[arg(long)]
        mime: Option<String>,
    },
    /// List analysed documents
    List,
    /// Show one document
    Show {
        id: i64,
        /// Keep polling until the analysis finishes
        #[arg(long)]
        watch: bool,
    },
    /// Delete a document
    Delete { id: i64 },
    /// Save the uploaded contract, or its improved version, to disk
    Download {
        id: i64,
        #[arg(long)]
        improved: bool,
        /// Target file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show plan and remaining checks
    Profile,
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    /// Buy a plan (pro or business)
    Pay { plan: Tier },
    /// Ping the backend
    Health,
}

impl Command {
    fn document_id(&self) -> Option<i64> {
        match self {
            Command::Show { id, .. } | Command::Delete { id } | Command::Download { id, .. } => {
                Some(*id)
            }
            _ => None,
        }
    }
}

/// Runs one command, then follows the navigation it produced.
pub async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    let document_id = command.document_id();
    let outcome = match dispatch(state, command).await {
        Ok(Some(next)) => follow(state, next).await,
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(e) => {
            let next = match (&e, document_id) {
                (ClientError::NotFound { .. }, Some(_)) => Some(Navigation::Dashboard),
                _ => e.navigation(),
            };
            if let Some(next) = next {
                println!("{}", hint(&next));
            }
            if e.is_retryable() {
                println!("This looks temporary, try again in a moment.");
            }
            Err(e.into())
        }
    }
}

async fn dispatch(state: &AppState, command: Command) -> Result<Option<Navigation>, ClientError> {
    let api = &state.api;
    let next = match command {
        Command::Login { email, password } => auth::login(api, &email, &password).await?,
        Command::Register { email, password } => auth::register(api, &email, &password).await?,
        Command::Logout => auth::logout(api).await?,
        Command::Whoami => {
            match api.sessions().load()? {
                Some(Session {
                    user: Some(user), ..
                }) => println!("{} <{}>", user.username, user.email),
                Some(_) => println!("signed in"),
                None => println!("not signed in"),
            }
            return Ok(None);
        }
        Command::Upload { path, mime } => {
            let file = UploadFile::from_path(&path, mime.as_deref())?;
            println!("Analysing {}, this can take a minute...", file.file_name);
            documents::analyze(api, file).await?
        }
        Command::List => Navigation::Dashboard,
        Command::Show { id, watch: false } => Navigation::Document(id),
        Command::Show { id, watch: true } => {
            watch_document(state, id).await?;
            return Ok(None);
        }
        Command::Delete { id } => documents::delete_document(api, id).await?,
        Command::Download {
            id,
            improved,
            output,
        } => {
            let path = documents::download(api, id, improved, output.as_deref()).await?;
            println!("Saved to {}", path.display());
            return Ok(None);
        }
        Command::Profile => {
            let p = profile::user_info(api).await?;
            print!("{}", render::profile(&p));
            return Ok(None);
        }
        Command::ChangePassword {
            current,
            new,
            confirm,
        } => {
            let message = profile::change_password(api, &current, &new, &confirm).await?;
            println!("{}", message);
            return Ok(None);
        }
        Command::Pay { plan } => profile::create_payment(api, plan).await?,
        Command::Health => {
            let health = api::health(api).await?;
            match health.message {
                Some(m) => println!("{}: {}", health.status, m),
                None => println!("{}", health.status),
            }
            return Ok(None);
        }
    };
    Ok(Some(next))
}

/// Renders the destination screen, or a one-line pointer to it.
async fn follow(state: &AppState, next: Navigation) -> Result<(), ClientError> {
    match next {
        Navigation::Dashboard => {
            let docs = documents::list_documents(&state.api).await?;
            print!("{}", render::dashboard(&docs));
        }
        Navigation::Document(id) => {
            let doc = documents::get_document(&state.api, id).await?;
            print!("{}", render::document_detail(&doc, state.api.base_url()));
        }
        Navigation::Results(doc) => print!("{}", render::guest_results(&doc)),
        other => println!("{}", hint(&other)),
    }
    Ok(())
}

fn hint(next: &Navigation) -> String {
    match next {
        Navigation::Entry => "Signed out. Upload a contract as a guest or log in.".into(),
        Navigation::Login => "Please log in: contractcheck login <email>".into(),
        Navigation::Dashboard => "Back to your documents: contractcheck list".into(),
        Navigation::Document(id) => format!("Open it with: contractcheck show {}", id),
        Navigation::Results(_) => "Results are shown above.".into(),
        Navigation::External(url) => format!("Continue to payment: {}", url),
    }
}

/// Prints the document, then re-renders it as the analysis progresses.
async fn watch_document(state: &AppState, id: i64) -> Result<(), ClientError> {
    let source = Arc::new(state.api.clone()) as Arc<dyn DocumentSource>;
    let mut poller = DocumentPoller::new(source, id, state.config.poll_interval());
    let mut view = DocumentView::new(state.api.base_url());
    let Some(mut events) = poller.start() else {
        return Ok(());
    };

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PollEvent::Fetched(doc)) => {
                    if let Some(text) = view.apply(doc) {
                        println!("{}", text);
                    }
                }
                Some(PollEvent::Failed(e)) => {
                    error!(id, error = %e, "watch stopped");
                    return Err(e);
                }
                None => {
                    if let Some(doc) = view.current() {
                        info!(id, status = ?doc.status, score = ?doc.score, "watch finished");
                    }
                    break;
                }
            },
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "ctrl-c handler failed");
                }
                poller.stop();
                info!(id, "watch interrupted");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_name_the_next_step() {
        assert!(hint(&Navigation::Login).contains("contractcheck login"));
        assert_eq!(
            hint(&Navigation::External("https://pay.example/x".into())),
            "Continue to payment: https://pay.example/x"
        );
        assert!(hint(&Navigation::Document(5)).ends_with("show 5"));
    }

    #[test]
    fn document_commands_expose_their_id() {
        assert_eq!(Command::Delete { id: 3 }.document_id(), Some(3));
        let download = Command::Download {
            id: 4,
            improved: true,
            output: None,
        };
        assert_eq!(download.document_id(), Some(4));
        assert_eq!(Command::List.document_id(), None);
    }
}
