//! Principal administration commands.

mod register;
mod set_role;

pub use register::RegisterPrincipalCommand;
pub use set_role::SetRoleCommand;
