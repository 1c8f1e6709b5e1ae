//! Built-in tools.
//!
//! - [`identity`]: `get_me`, a projection of the caller's verified claims
//! - [`calculator`]: integer arithmetic (`add`, `subtract`, `multiply`,
//!   `divide`, `square`)

pub mod calculator;
pub mod identity;

use crate::error::Result;
use crate::tool::Tool;

/// Every built-in tool, ready for registration.
pub fn all() -> Result<Vec<Tool>> {
    let mut tools = vec![identity::get_me()?];
    tools.extend(calculator::tools()?);
    Ok(tools)
}
