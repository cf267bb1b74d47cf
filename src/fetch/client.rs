use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared requests. Credential wrappers in [`crate::fetch::auth`]
/// decorate an inner client, so the trip-store and roads clients stay
/// agnostic of how they authenticate.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Box<C> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
