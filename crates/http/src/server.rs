use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::Context;
use http::{header, Method, Request, Response, StatusCode};
use hyper::{body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    task,
};
use tracing::Instrument;

use crate::{
    body,
    controller::HomeController,
    instrument::{finalize_http_span, http_span, MatchedRoute},
    routes::Route,
    view::{Layout, ViewData},
    Body, TlsConfig,
};

/// An HTTP server for the Home, About and Contact pages.
pub struct HttpServer {
    /// The address the server is listening on.
    listen_addr: SocketAddr,
    /// The TLS configuration for the server.
    tls_config: Option<TlsConfig>,
    /// Page handlers.
    controller: HomeController,
    /// The layout every page renders into.
    layout: Layout,
}

impl HttpServer {
    /// Create a new [`HttpServer`].
    pub fn new(
        listen_addr: SocketAddr,
        tls_config: Option<TlsConfig>,
        controller: HomeController,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            listen_addr,
            tls_config,
            controller,
            layout: Layout::new()?,
        })
    }

    /// Binds the configured address and serves until `shutdown` completes.
    pub async fn serve(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.listen_addr).await.with_context(|| {
            format!(
                "Unable to listen on {listen_addr}",
                listen_addr = self.listen_addr
            )
        })?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serves incoming connections on `listener` until `shutdown` completes.
    ///
    /// Connections already accepted keep running in their own tasks.
    pub async fn serve_listener(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        let acceptor = self
            .tls_config
            .as_ref()
            .map(TlsConfig::server_config)
            .transpose()?;
        let scheme = if acceptor.is_some() { "https" } else { "http" };
        self.print_startup_msgs(scheme, &listener)?;

        tokio::pin!(shutdown);
        loop {
            let (stream, client_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => {
                    tracing::info!("Shutting down; no longer accepting connections");
                    return Ok(());
                }
            };
            match &acceptor {
                None => self.clone().serve_connection(stream, client_addr),
                Some(acceptor) => {
                    let acceptor = acceptor.clone();
                    let server = self.clone();
                    task::spawn(async move {
                        match acceptor.accept(stream).await {
                            Ok(stream) => server.serve_connection(stream, client_addr),
                            Err(err) => tracing::error!(?err, "Failed to start TLS session"),
                        }
                    });
                }
            }
        }
    }

    /// Handles one request.
    ///
    /// Page routes always render with `200 OK`, including a failed secret
    /// lookup on the index page.
    pub async fn handle<B>(&self, req: Request<B>) -> anyhow::Result<Response<Body>> {
        let (parts, _) = req.into_parts();
        let path = parts.uri.path();

        tracing::info!("Processing request on path '{path}'");

        let Some(route) = Route::resolve(path) else {
            return Self::not_found();
        };
        if parts.method != Method::GET && parts.method != Method::HEAD {
            return Self::method_not_allowed(route);
        }

        let view = match route {
            Route::Health => {
                return Ok(MatchedRoute::with_response_extension(
                    Response::new(body::full("OK")),
                    route.as_str(),
                ))
            }
            Route::Index => ViewData::index(self.controller.index().await),
            Route::About => ViewData::about(self.controller.about()),
            Route::Contact => ViewData::contact(self.controller.contact()),
        };

        let response = Response::builder()
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(body::full(self.layout.render(&view)?))?;
        Ok(MatchedRoute::with_response_extension(
            response,
            route.as_str(),
        ))
    }

    /// Creates an HTTP 404 response.
    fn not_found() -> anyhow::Result<Response<Body>> {
        Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body::full("Not Found"))?)
    }

    /// Creates an HTTP 405 response.
    fn method_not_allowed(route: Route) -> anyhow::Result<Response<Body>> {
        Ok(MatchedRoute::with_response_extension(
            Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(header::ALLOW, "GET, HEAD")
                .body(body::empty())?,
            route.as_str(),
        ))
    }

    fn serve_connection<S: AsyncRead + AsyncWrite + Unpin + Send + 'static>(
        self: Arc<Self>,
        stream: S,
        client_addr: SocketAddr,
    ) {
        task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(
                    TokioIo::new(stream),
                    service_fn(move |request| {
                        self.clone().instrumented_service_fn(client_addr, request)
                    }),
                )
                .await
            {
                tracing::warn!("Error serving HTTP connection: {err:?}");
            }
        });
    }

    async fn instrumented_service_fn(
        self: Arc<Self>,
        client_addr: SocketAddr,
        request: Request<Incoming>,
    ) -> anyhow::Result<Response<Body>> {
        let span = http_span!(request, client_addr);
        let method = request.method().to_string();
        async {
            let result = self.handle(request).await;
            finalize_http_span(result, method)
        }
        .instrument(span)
        .await
    }

    fn print_startup_msgs(&self, scheme: &str, listener: &TcpListener) -> anyhow::Result<()> {
        let local_addr = listener.local_addr()?;
        let base_url = format!("{scheme}://{local_addr:?}");
        tracing::info!("Serving {base_url}");

        println!("Serving {base_url}");
        println!("Available Routes:");
        for route in [Route::Index, Route::About, Route::Contact, Route::Health] {
            println!("  {base_url}{}", route.as_str());
        }
        Ok(())
    }
}
