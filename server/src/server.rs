use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::header::HeaderValue;
use warp::http::Response;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::export;
use crate::pipeline::Pipeline;

pub async fn run(address: std::net::SocketAddr, pipeline: Arc<Pipeline>) {
    log::info!("Listening on http://{}", address);
    warp::serve(routes(pipeline)).run(address).await
}

pub fn routes(
    pipeline: Arc<Pipeline>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health_route = warp::path!("health")
        .and(warp::get())
        .map(|| StatusCode::OK);

    let observations_route = warp::path!("owners" / String / "observations")
        .and(warp::get())
        .and(with_pipeline(pipeline.clone()))
        .and_then(observations);

    let status_route = warp::path!("owners" / String / "status")
        .and(warp::get())
        .and(with_pipeline(pipeline.clone()))
        .and_then(status);

    let export_route = warp::path!("owners" / String / "export.csv")
        .and(warp::get())
        .and(with_pipeline(pipeline.clone()))
        .and_then(export_csv);

    let refresh_route = warp::path!("owners" / String / "refresh")
        .and(warp::post())
        .and(with_pipeline(pipeline))
        .and_then(refresh);

    health_route
        .or(observations_route)
        .or(status_route)
        .or(export_route)
        .or(refresh_route)
        .recover(rejection)
}

fn with_pipeline(
    pipeline: Arc<Pipeline>,
) -> impl Filter<Extract = (Arc<Pipeline>,), Error = Infallible> + Clone {
    warp::any().map(move || pipeline.clone())
}

pub async fn observations(owner: String, pipeline: Arc<Pipeline>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&pipeline.history(&owner).await))
}

pub async fn status(owner: String, pipeline: Arc<Pipeline>) -> Result<impl Reply, Rejection> {
    pipeline
        .status(&owner)
        .map(|status| warp::reply::json(&status))
        .ok_or_else(warp::reject::not_found)
}

pub async fn export_csv(owner: String, pipeline: Arc<Pipeline>) -> Result<impl Reply, Rejection> {
    let history = pipeline.history(&owner).await;
    let csv = export::to_csv_string(&history).map_err(|e| warp::reject::custom(Error(e)))?;
    let filename = export::export_filename(chrono::Utc::now().date_naive());

    Response::builder()
        .header(
            "Content-Type",
            HeaderValue::from_static("text/csv; charset=utf-8"),
        )
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(csv)
        .map_err(|e| warp::reject::custom(Error(e.into())))
}

pub async fn refresh(owner: String, pipeline: Arc<Pipeline>) -> Result<impl Reply, Rejection> {
    let reply = match pipeline.run(&owner).await {
        Some(status) => {
            warp::reply::with_status(warp::reply::json(&status), StatusCode::OK).into_response()
        }
        None => {
            let code = StatusCode::CONFLICT;
            let json = warp::reply::json(&ErrorMessage {
                code: code.as_u16(),
                message: "Refresh already in progress.".into(),
            });
            warp::reply::with_status(json, code).into_response()
        }
    };
    Ok(reply)
}

#[derive(Debug)]
struct Error(anyhow::Error);
impl warp::reject::Reject for Error {}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

pub async fn rejection(err: warp::Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        log::error!("Error: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    };

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message: message.into(),
    });

    Ok(warp::reply::with_status(json, code))
}
