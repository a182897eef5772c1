//! udp-api-core: parameter and endpoint declarations shared by the UDP notebook tooling.

pub mod bands;
pub mod declaration;
pub mod endpoint;
pub mod extent;

pub use bands::{normalize_band_name, BandFamily, BandInfo};
pub use declaration::{Constraints, DeclarationParseError, ParameterDeclaration, ParameterKind};
pub use endpoint::{
    AuthMethod, BandCase, BandFormat, BandFormatError, BandToken, EndpointDeclaration,
};
pub use extent::{BoundingBox, ExtentError, TemporalExtent};
