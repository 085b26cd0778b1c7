// One-shot HTTP/1 requests over the local engine UNIX socket. Used for the
// raw task listing and the pass-through proxy route.

use hyper::body::{Body, Incoming};
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;

use super::DockerClientError;

/// Open a fresh connection to `socket_path` and send one request. The
/// connection driver is spawned and runs until the response body is done.
pub(crate) async fn send_request<B>(
    socket_path: &str,
    req: Request<B>,
) -> Result<Response<Incoming>, DockerClientError>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let stream = UnixStream::connect(socket_path).await?;
    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "engine socket connection ended");
        }
    });
    Ok(sender.send_request(req).await?)
}
