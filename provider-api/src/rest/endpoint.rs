use std::borrow::Cow;

use http::{HeaderMap, Method};

use crate::error::Error;

use super::params::QueryParams;

pub trait Endpoint {
    fn method(&self) -> Method {
        return Method::GET;
    }

    fn endpoint(&self) -> Cow<'static, str>;

    fn params(&self) -> QueryParams {
        return QueryParams::default();
    }

    fn headers(&self) -> Result<HeaderMap, Error> {
        return Ok(HeaderMap::new());
    }

    fn content_type(&self) -> Option<&'static str> {
        return None;
    }

    fn body(&self) -> Result<Vec<u8>, Error> {
        return Ok(Vec::new());
    }
}
