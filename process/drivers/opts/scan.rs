use std::borrow::Cow;

use bon::Builder;

#[derive(Debug, Clone, Builder)]
pub struct ScanOpts<'scope> {
    /// The image ref to scan.
    #[builder(into)]
    pub image: Cow<'scope, str>,
}
