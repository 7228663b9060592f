//! Pulse widget simulator — runs the widget against a headless host page.
//!
//! Builds an in-memory page with an embedding script tag, starts the widget,
//! performs one interaction once the popup is up and prints the outcome.
//!
//! Usage: `pulse-widget-sim --help`

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use pulse_widget::host::{MemoryDocument, ScriptElement};
use pulse_widget::markup::{CLOSE_BUTTON_ID, CTA_BUTTON_ID, POPUP_ROOT_ID};
use pulse_widget::resolver::{BUSINESS_ID_ATTR, EMAIL_ATTR};
use pulse_widget::{logging, Widget, WidgetSettings};

/// How to dismiss the popup once it is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CloseAction {
    /// Click the close button.
    Button,
    /// Click the backdrop outside the panel.
    Overlay,
    /// Click the call-to-action, then the close button.
    CtaThenButton,
}

#[derive(Parser, Debug)]
#[command(
    name = "pulse-widget-sim",
    about = "Run the retention widget against a headless host page"
)]
struct Args {
    /// Value for the embedding script's data-business-id attribute.
    #[arg(long)]
    business_id: Option<String>,

    /// Value for the embedding script's data-email attribute.
    #[arg(long)]
    email: Option<String>,

    #[arg(long, value_enum, default_value_t = CloseAction::Button)]
    close: CloseAction,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args = Args::parse();

    let settings = WidgetSettings::load_or_default();
    let wait = settings.show_delay() + Duration::from_millis(200);

    let doc = Arc::new(MemoryDocument::loading());
    let mut script = ScriptElement::new(Some(&format!(
        "https://cdn.pulse.example/{}",
        settings.script_filename
    )));
    if let Some(business_id) = &args.business_id {
        script = script.with_attribute(BUSINESS_ID_ATTR, business_id);
    }
    if let Some(email) = &args.email {
        script = script.with_attribute(EMAIL_ATTR, email);
    }
    doc.execute_script(script);

    let handle = Widget::new(doc.clone(), settings).start();
    doc.finish_parsing();

    tokio::time::sleep(wait).await;
    match doc.html_of(POPUP_ROOT_ID) {
        Some(html) => println!("{}", html),
        None => {
            println!("No popup rendered");
            return match handle.finished().await {
                Ok(outcome) => {
                    println!("Outcome: {:?}", outcome);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", e);
                    ExitCode::FAILURE
                }
            };
        }
    }

    match args.close {
        CloseAction::Button => {
            doc.click(CLOSE_BUTTON_ID);
        }
        CloseAction::Overlay => {
            doc.click(POPUP_ROOT_ID);
        }
        CloseAction::CtaThenButton => {
            doc.click(CTA_BUTTON_ID);
            doc.click(CLOSE_BUTTON_ID);
        }
    }

    match handle.finished().await {
        Ok(outcome) => {
            println!("Outcome: {:?}", outcome);
            println!("Popups remaining: {}", doc.count_elements(POPUP_ROOT_ID));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
