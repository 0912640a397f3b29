//! Authorization
//!
//! - [`AuthorizationResolver`]: role lookup and dashboard visibility
//! - [`PermissionMatrix`]: grid view of grants for the admin editor

mod matrix;
mod resolver;

pub use matrix::{MatrixColumn, MatrixRow, PermissionMatrix};
pub use resolver::{AuthorizationResolver, ResolveError, Visibility};
