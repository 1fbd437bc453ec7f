//! Presence confirmation on the controlling terminal.

use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use tracing::debug;

use credvault_common::Result;
use credvault_keystore::SoftwareKeystore;
use credvault_vault::{Authenticator, ChallengeResponder, PromptInfo};

/// Asks the user to confirm on stdin. Confirmation unlocks the keystore for
/// the key's validity window.
pub struct TerminalAuthenticator {
    keystore: Arc<SoftwareKeystore>,
}

impl TerminalAuthenticator {
    pub fn new(keystore: Arc<SoftwareKeystore>) -> Self {
        Self { keystore }
    }
}

/// Outcome of one line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Confirm,
    Cancel,
    Retry,
}

fn interpret(line: &str, negative_button: &str) -> Answer {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("y") || line.eq_ignore_ascii_case("yes") {
        Answer::Confirm
    } else if line.eq_ignore_ascii_case(negative_button) || line.eq_ignore_ascii_case("n") {
        Answer::Cancel
    } else {
        Answer::Retry
    }
}

impl Authenticator for TerminalAuthenticator {
    fn is_available(&self) -> bool {
        std::io::stdin().is_terminal()
    }

    fn begin_challenge(&self, prompt: &PromptInfo, responder: ChallengeResponder) -> Result<()> {
        let keystore = self.keystore.clone();
        let prompt = prompt.clone();

        std::thread::Builder::new()
            .name("presence-prompt".to_string())
            .spawn(move || {
                eprintln!("{}", prompt.title);
                eprintln!("{}", prompt.subtitle);

                let stdin = std::io::stdin();
                loop {
                    eprint!("Confirm [Y/{}]: ", prompt.negative_button.to_lowercase());
                    let _ = std::io::stderr().flush();

                    let mut line = String::new();
                    match stdin.lock().read_line(&mut line) {
                        Ok(0) => return responder.error("Input closed"),
                        Ok(_) => match interpret(&line, &prompt.negative_button) {
                            Answer::Confirm => {
                                keystore.record_user_presence();
                                return responder.succeeded();
                            }
                            Answer::Cancel => return responder.error("user cancelled"),
                            Answer::Retry => {
                                responder.attempt_failed();
                                debug!(answer = line.trim(), "Unrecognized answer");
                            }
                        },
                        Err(e) => {
                            return responder.error(format!("Could not read confirmation: {}", e))
                        }
                    }
                }
            })?;

        Ok(())
    }
}
