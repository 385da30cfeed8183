//! Authentication for the Developer API.
//!
//! Two credential shapes are supported, matching the two API generations:
//!
//! 1. **v3** - a single secret key exchanged for a bearer token
//! 2. **v2** - an API key plus an OAuth client id/secret pair
//!
//! ```no_run
//! use enverus_rs::{Credentials, TokenManager};
//!
//! # async fn example(tokens: TokenManager) -> enverus_rs::Result<()> {
//! let creds = Credentials::v3("your-secret-key");
//! creds.validate()?;
//!
//! // Tokens are fetched lazily and refreshed when the server rejects them.
//! let token = tokens.current_token().await?;
//! println!("issued at {}", token.issued_at());
//! # Ok(())
//! # }
//! ```

mod credentials;
mod token;

pub use credentials::Credentials;
pub use token::{Token, TokenManager};
