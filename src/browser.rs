//! Terminal stand-in for the mobile in-app browser sheet.
//!
//! Prints the authorization URL, then waits for the user to paste the URL the
//! browser was redirected to. An empty line (or EOF) dismisses the session.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use url::Url;

use crate::session::{AuthBrowser, BrowserOutcome};

#[derive(Debug, Default)]
pub struct ConsoleBrowser;

#[async_trait::async_trait]
impl AuthBrowser for ConsoleBrowser {
    async fn open_auth_session(&self, auth_url: &Url, redirect_uri: &str) -> BrowserOutcome {
        if let Err(e) = write_prompt(&mut tokio::io::stderr(), auth_url, redirect_uri).await {
            tracing::warn!(error = %e, "failed to write browser prompt");
        }

        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(_) => interpret_input(&line, redirect_uri),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read redirect url");
                BrowserOutcome::Cancelled
            }
        }
    }
}

/// Write the sign-in prompt and flush it.
pub(crate) async fn write_prompt<W>(out: &mut W, auth_url: &Url, redirect_uri: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let prompt = format!(
        "Open this URL to sign in:\n\n  {auth_url}\n\nPaste the {redirect_uri} URL you were redirected to (empty line cancels):\n"
    );
    out.write_all(prompt.as_bytes()).await?;
    out.flush().await
}

/// Map a pasted line to a browser outcome.
///
/// Input that does not start with the redirect URI is still passed through;
/// the redirect parser decides whether it is usable.
pub(crate) fn interpret_input(line: &str, redirect_uri: &str) -> BrowserOutcome {
    let url = line.trim();
    if url.is_empty() {
        return BrowserOutcome::Cancelled;
    }
    if !url.starts_with(redirect_uri) {
        tracing::debug!("pasted url does not match redirect uri");
    }
    BrowserOutcome::Success { url: url.to_string() }
}

#[cfg(test)]
#[path = "browser_test.rs"]
mod tests;
