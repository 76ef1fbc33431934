use bytes::Bytes;
use std::io;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;
use vireo_http::protocol::Request;
use vireo_http::transport::Http1Writer;
use vireo_web::{Context, Controller, ControllerRegistry, DispatchError, Router};

#[derive(Default)]
struct HelloWorld;

impl Controller for HelloWorld {
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        ctx.response().set_body("hello world\r\n");
        Ok(())
    }
}

#[derive(Default)]
struct NotFound;

impl Controller for NotFound {
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        ctx.response().set_status(http::StatusCode::NOT_FOUND).set_body("404 not found\r\n");
        Ok(())
    }
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut registry = ControllerRegistry::new();
    registry
        .register::<HelloWorld>("Demo\\HelloWorld")
        .and_then(|registry| registry.register::<NotFound>("Demo\\NotFound"))
        .expect("demo controllers are valid");

    let mut router = Router::new(registry);
    router.route("/", "Demo\\HelloWorld").expect("demo route is valid");
    router.fallback_controller("Demo\\NotFound").expect("fallback is registered");

    for path in ["/", "/missing"] {
        let request = http::Request::get(path).body(Bytes::new()).expect("demo request is valid");
        let request = match Request::from_http(request) {
            Ok(request) => request,
            Err(e) => {
                error!(cause = %e, "invalid request");
                continue;
            }
        };

        let mut writer = Http1Writer::new(io::stdout().lock());
        match router.dispatch(request, false) {
            Ok(handle) => {
                if let Err(e) = handle.send(&mut writer) {
                    error!(cause = %e, "failed to write response");
                }
            }
            Err(e) => error!(cause = %e, "dispatch failed"),
        }
        println!();
    }
}
