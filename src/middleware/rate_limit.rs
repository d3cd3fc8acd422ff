use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

/// Fixed-window request counter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
    // IP -> (request_count, window_start)
    clients: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window_duration: Duration::from_secs(window_seconds),
        }
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<String, (u32, Instant)>> {
        // A panic mid-update leaves at worst a stale counter
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn check_rate_limit(&self, client_ip: &str) -> bool {
        self.check_at(client_ip, Instant::now())
    }

    fn check_at(&self, client_ip: &str, now: Instant) -> bool {
        let mut clients = self.clients();
        let (count, window_start) = clients
            .entry(client_ip.to_string())
            .or_insert((0, now));

        if now.duration_since(*window_start) > self.window_duration {
            *count = 1;
            *window_start = now;
            true
        } else if *count >= self.max_requests {
            false
        } else {
            *count += 1;
            true
        }
    }

    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let window = self.window_duration;
        self.clients()
            .retain(|_, (_, window_start)| now.duration_since(*window_start) <= window);
    }
}

fn reject(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "success": false,
            "message": message,
            "retry_after": 60
        })),
    )
}

async fn limit(
    limiter: &RateLimiter,
    addr: SocketAddr,
    message: &str,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let client_ip = addr.ip().to_string();
    if !limiter.check_rate_limit(&client_ip) {
        tracing::warn!("Rate limit exceeded for IP: {}", client_ip);
        return Err(reject(message));
    }

    // Occasionally clean up expired entries
    if rand::random::<u8>() < 10 {
        limiter.cleanup_expired();
    }

    Ok(next.run(request).await)
}

/// 20 relay calls per minute per IP; each one spends upstream model quota.
pub async fn completion_rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    static LIMITER: OnceLock<RateLimiter> = OnceLock::new();
    let limiter = LIMITER.get_or_init(|| RateLimiter::new(20, 60));
    limit(limiter, addr, "Too many chat requests. Please try again later.", request, next).await
}

/// 10 requests per minute per IP for sign-in and sign-up.
pub async fn strict_rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    static LIMITER: OnceLock<RateLimiter> = OnceLock::new();
    let limiter = LIMITER.get_or_init(|| RateLimiter::new(10, 60));
    limit(
        limiter,
        addr,
        "Rate limit exceeded for sensitive operations. Please try again later.",
        request,
        next,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_after_max_requests() {
        let limiter = RateLimiter::new(3, 60);
        let now = Instant::now();

        assert!(limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(!limiter.check_at("10.0.0.1", now));
        // other clients have their own window
        assert!(limiter.check_at("10.0.0.2", now));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, 60);
        let start = Instant::now();

        assert!(limiter.check_at("10.0.0.1", start));
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(30)));
        assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(61)));
    }
}
