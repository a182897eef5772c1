//! The one outward call the engine makes: opening a backend connection.

use udp_api_core::AuthMethod;

/// Opens a connection to a processing backend.
///
/// The engine only decides *where* to connect and *how* to authenticate;
/// whatever the connector returns, success or failure, is handed back to the
/// caller untouched.
pub trait Connector {
    type Connection;
    type Error;

    fn connect(&self, url: &str, auth_method: AuthMethod) -> Result<Self::Connection, Self::Error>;
}

impl<F, T, E> Connector for F
where
    F: Fn(&str, AuthMethod) -> Result<T, E>,
{
    type Connection = T;
    type Error = E;

    fn connect(&self, url: &str, auth_method: AuthMethod) -> Result<T, E> {
        self(url, auth_method)
    }
}
