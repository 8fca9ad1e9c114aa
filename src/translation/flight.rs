//! 单飞（single-flight）守卫
//!
//! 同一时间只允许一个翻译请求在途。新请求在已有请求未完成时直接被丢弃，
//! 不排队。许可在释放（`Drop`）或超过超时时间后失效，后者防止一个从未
//! 返回的请求永久锁住客户端。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Flight {
    id: u64,
    started: Instant,
}

/// 单飞守卫
#[derive(Debug)]
pub struct SingleFlight {
    current: Mutex<Option<Flight>>,
    next_id: AtomicU64,
    timeout: Duration,
}

/// 在途许可，离开作用域时释放
#[derive(Debug)]
pub struct FlightPermit<'a> {
    owner: &'a SingleFlight,
    id: u64,
}

impl SingleFlight {
    pub fn new(timeout: Duration) -> Self {
        Self {
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 尝试获取许可；已有未过期的在途请求时返回 `None`
    pub fn try_acquire(&self) -> Option<FlightPermit<'_>> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(flight) = *current {
            if flight.started.elapsed() < self.timeout {
                return None;
            }
            tracing::warn!("在途翻译超过 {:?} 未完成，强制释放", self.timeout);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *current = Some(Flight {
            id,
            started: Instant::now(),
        });

        Some(FlightPermit { owner: self, id })
    }

    /// 是否有未过期的在途请求
    pub fn is_busy(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map_or(false, |flight| flight.started.elapsed() < self.timeout)
    }

    fn release(&self, id: u64) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        // 过期后被新请求接管的许可不能释放新请求
        if current.map_or(false, |flight| flight.id == id) {
            *current = None;
        }
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.owner.release(self.id);
    }
}
