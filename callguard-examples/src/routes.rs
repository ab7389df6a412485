use std::sync::Arc;
use std::time::Duration;

use actix_web::web::{Data, Path};
use actix_web::{HttpResponse, get};
use callguard::{
    AwaitableCall, HttpError, HttpReporter, Instrumented, OrdinaryCall, PayloadReporter, Raised,
    Reply,
};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::scratch::ScratchPool;

/// Longest delay `/slow` accepts.
const MAX_DELAY_MS: u64 = 5_000;

/// Bytes leased from the scratch pool per millisecond of delay.
const BYTES_PER_MS: usize = 1_024;

pub type DivideFn = fn((i64, i64)) -> Result<i64, &'static str>;

pub type SlowFn = fn((u64, Arc<ScratchPool>)) -> BoxFuture<'static, Result<usize, HttpError>>;

pub fn divide((dividend, divisor): (i64, i64)) -> Result<i64, &'static str> {
    dividend.checked_div(divisor).ok_or("division by zero")
}

/// Sleeps for `delay_ms` and returns how many scratch bytes are cached.
pub fn slow((delay_ms, pool): (u64, Arc<ScratchPool>)) -> BoxFuture<'static, Result<usize, HttpError>> {
    async move {
        if delay_ms > MAX_DELAY_MS {
            return Err(HttpError::new(
                400,
                format!("delay must not exceed {MAX_DELAY_MS} ms"),
            ));
        }

        let cached = pool.lease(delay_ms as usize * BYTES_PER_MS);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        Ok(cached)
    }
    .boxed()
}

#[get("/divide/{dividend}/{divisor}")]
pub async fn divide_http(
    divide: Data<Instrumented<OrdinaryCall<DivideFn>, HttpReporter>>,
    path: Path<(i64, i64)>,
) -> Result<HttpResponse, Raised<&'static str>> {
    let quotient = divide.call(path.into_inner())?;

    Ok(HttpResponse::Ok().json(quotient))
}

#[get("/divide/{dividend}/{divisor}")]
pub async fn divide_payload(
    divide: Data<Instrumented<OrdinaryCall<DivideFn>, PayloadReporter>>,
    path: Path<(i64, i64)>,
) -> Result<Reply<i64>, Raised<&'static str>> {
    divide.call(path.into_inner()).map_err(Raised::Classified)
}

#[get("/slow/{delay_ms}")]
pub async fn slow_route(
    slow: Data<Instrumented<AwaitableCall<SlowFn>, HttpReporter>>,
    pool: Data<ScratchPool>,
    path: Path<u64>,
) -> Result<HttpResponse, Raised<HttpError>> {
    let cached = slow.call((path.into_inner(), pool.into_inner())).await?;

    Ok(HttpResponse::Ok().json(cached))
}
