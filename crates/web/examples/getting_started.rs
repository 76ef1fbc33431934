//! Walks a few requests through a router that uses namespace routes,
//! authentication, forwards, redirects and a custom serializer.
//!
//! Each response is printed as HTTP/1.1 on stdout.

use bytes::Bytes;
use http::{Method, StatusCode};
use std::io;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;
use vireo_http::protocol::{Response, SendError};
use vireo_http::transport::{Http1Writer, Transport};
use vireo_web::auth::HttpBasic;
use vireo_web::{Context, Controller, ControllerRegistry, DispatchError, EntryPoint, Router, ValidationError};

#[derive(Default)]
struct OrdersList;

impl Controller for OrdersList {
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        let page = ctx.input().get_str("page").unwrap_or("1").to_string();
        let mut output = ctx.output();
        output.set("page", page);
        output.set("orders", serde_json::json!([{"id": 1, "total": 12.5}, {"id": 2, "total": 3.0}]));
        Ok(())
    }
}

#[derive(Default)]
struct Reports;

impl Reports {
    fn monthly(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        ctx.output().set("report", "monthly");
        Ok(())
    }
}

impl Controller for Reports {
    const ENTRY_POINTS: &'static [(&'static str, EntryPoint<Self>)] = &[("monthly", Self::monthly)];

    fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        if let Some(result) = self.call_entry_point(ctx) {
            return result;
        }
        ctx.output().set("report", "daily");
        Ok(())
    }
}

#[derive(Default)]
struct LegacyOrders;

impl Controller for LegacyOrders {
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        ctx.output().set("legacy", true);
        ctx.forward("/shop/orders/list", Some(Method::GET))?;
        Ok(())
    }
}

#[derive(Default)]
struct MonthlyReport;

impl Controller for MonthlyReport {
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        ctx.forward_to_controller("Shop\\Admin\\Reports", Some("monthly"))?;
        Ok(())
    }
}

#[derive(Default)]
struct Home;

impl Controller for Home {
    fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        ctx.redirect("/shop/orders/list", Some(StatusCode::SEE_OTHER))
    }
}

fn csv(response: &Response) -> Result<Bytes, SendError> {
    let mut csv = String::from("key,value\n");
    for (key, value) in response.payload().iter() {
        csv.push_str(&format!("{key},{value}\n"));
    }
    Ok(Bytes::from(csv))
}

fn build_router() -> Result<Router, ValidationError> {
    let mut registry = ControllerRegistry::new();
    registry
        .register::<OrdersList>("Shop\\Orders\\List")?
        .register::<Reports>("Shop\\Admin\\Reports")?
        .register::<MonthlyReport>("Shop\\Admin\\Monthly")?
        .register::<LegacyOrders>("Shop\\Legacy")?
        .register::<Home>("Shop\\Home")?;

    let gate = HttpBasic::new("shop admin").user("ada", "lovelace").unauthorized(|e| {
        info!(realm = e.realm(), reason = %e.kind(), "login required");
    });

    let mut router = Router::new(registry);
    router.route("/", "Shop\\Home")?;
    router.route("/legacy/orders", "Shop\\Legacy")?;
    router.route("/admin/*", "Shop\\Admin\\*")?.with_authentication(Arc::new(gate));
    router.route("/shop/*", "Shop\\*")?;
    router.negotiator_mut().register("text/csv", csv)?;

    Ok(router)
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = build_router().expect("demo router is valid");
    info!(routes = router.routes_count(), "router ready");

    let requests = [
        ("/", None, None),
        ("/shop/orders/list?page=2", Some("application/json"), None),
        ("/shop/orders/list", Some("text/csv"), None),
        ("/legacy/orders", Some("text/html,application/json"), None),
        ("/admin/monthly", None, None),
        ("/admin/monthly", Some("application/json"), Some("Basic YWRhOmxvdmVsYWNl")),
        ("/shop/nowhere", None, None),
    ];

    for (path, accept, authorization) in requests {
        let mut request = http::Request::get(path);
        if let Some(accept) = accept {
            request = request.header(http::header::ACCEPT, accept);
        }
        if let Some(authorization) = authorization {
            request = request.header(http::header::AUTHORIZATION, authorization);
        }
        let request = request.body(Bytes::new()).expect("demo request is valid");

        info!(path, "request");
        let response = router.respond(request);

        let mut writer = Http1Writer::new(io::stdout().lock());
        let written = writer
            .send_status(response.status())
            .and_then(|()| response.headers().iter().try_for_each(|(name, value)| writer.send_header(name, value)))
            .and_then(|()| writer.send_body(response.body().clone()));
        if let Err(e) = written {
            tracing::error!(cause = %e, "failed to write response");
        }
        println!();
    }
}
