pub mod query_string;
pub mod route_template;
pub mod url_generator;
pub mod url_signer;

pub use query_string::{parse_query, stringify_query, QueryMap, QueryValue};
pub use route_template::ParamMap;
pub use url_generator::{
    RouteDescriptor, RouteResolver, StaticRouteResolver, UrlGenerator, RESERVED_QUERY_PARAM_NAMES,
};
pub use url_signer::{generate_secret, UrlSigner};
