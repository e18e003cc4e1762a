use std::borrow::Cow;

use url::Url;

#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    params: Vec<(Cow<'static, str>, String)>,
}

impl QueryParams {
    pub fn push(&mut self, key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> &mut Self {
        self.params.push((key.into(), value.into()));
        return self;
    }

    pub fn add_to_url(&self, url: &mut Url) {
        if self.params.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        for (key, value) in self.params.iter() {
            pairs.append_pair(key, value);
        }
    }
}
