use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinError;

type Call<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;
type Calls<T, E> = Arc<Mutex<HashMap<String, Call<T, E>>>>;

/// 同一个键同时只有一个计算在进行，其余调用方等待并共享它的结果
///
/// 计算在独立任务中执行，调用方全部取消时仍会跑完。结果（包括错误）只分发给
/// 当次等待的调用方，计算结束后条目即被移除，不会留作缓存。
pub struct SingleFlight<T, E> {
    calls: Calls<T, E>,
}

impl<T, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

// 计算任务结束（包括 panic 和运行时关闭）时移除自己的条目
struct Finish<T, E> {
    calls: Calls<T, E>,
    key: String,
}

impl<T, E> Drop for Finish<T, E> {
    fn drop(&mut self) {
        lock(&self.calls).remove(&self.key);
    }
}

fn lock<V>(calls: &Mutex<V>) -> MutexGuard<'_, V> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 执行或加入 `key` 上的计算，返回结果以及本次调用是否发起了计算
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> (Result<T, E>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (call, leader) = {
            let mut calls = lock(&self.calls);
            match calls.get(key) {
                Some(call) => (call.clone(), false),
                None => {
                    let finish = Finish {
                        calls: self.calls.clone(),
                        key: key.to_string(),
                    };
                    let work = make();
                    // 插入条目时持有锁，任务不可能先于插入完成清理
                    let handle = tokio::spawn(async move {
                        let _finish = finish;
                        work.await
                    });
                    let call = handle
                        .map(|joined| joined.unwrap_or_else(|e| Err(E::from(e))))
                        .boxed()
                        .shared();
                    calls.insert(key.to_string(), call.clone());
                    (call, true)
                }
            }
        };

        (call.await, leader)
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::GenerationError;

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let flight: Arc<SingleFlight<u32, GenerationError>> = Arc::new(SingleFlight::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flight = flight.clone();
                let runs = runs.clone();
                tokio::spawn(async move {
                    flight
                        .run("fp", || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(7)
                        })
                        .await
                })
            })
            .collect();

        let mut leaders = 0;
        for handle in futures_util::future::join_all(handles).await {
            let (result, leader) = handle.unwrap();
            assert_eq!(result, Ok(7));
            leaders += usize::from(leader);
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(leaders, 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn errors_are_not_retained() {
        let flight: SingleFlight<u32, GenerationError> = SingleFlight::new();
        let boom = GenerationError::Upstream("boom".into());

        let failing = boom.clone();
        let (first, _) = flight.run("fp", move || async move { Err(failing) }).await;
        assert_eq!(first, Err(boom));

        let (second, leader) = flight.run("fp", || async { Ok(1) }).await;
        assert_eq!(second, Ok(1));
        assert!(leader);
    }

    #[tokio::test]
    async fn different_keys_run_independently() {
        let flight: SingleFlight<&'static str, GenerationError> = SingleFlight::new();
        let (a, a_leader) = flight.run("a", || async { Ok("a") }).await;
        let (b, b_leader) = flight.run("b", || async { Ok("b") }).await;
        assert_eq!((a, b), (Ok("a"), Ok("b")));
        assert!(a_leader && b_leader);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_caller_does_not_strand_the_computation() {
        let flight: SingleFlight<u32, GenerationError> = SingleFlight::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            flight.run("fp", move || async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            }),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(flight.in_flight(), 1);

        // 无人等待时计算照常完成并移除条目
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);

        let (result, leader) = flight.run("fp", || async { Ok(2) }).await;
        assert_eq!(result, Ok(2));
        assert!(leader);
    }

    #[tokio::test]
    async fn panicking_computation_is_reported_and_removed() {
        let flight: SingleFlight<u32, GenerationError> = SingleFlight::new();

        let (result, _) = flight
            .run("fp", || async {
                if flight_should_panic() {
                    panic!("summarizer blew up");
                }
                Ok(1)
            })
            .await;
        assert!(matches!(result, Err(GenerationError::Aborted(_))));
        assert_eq!(flight.in_flight(), 0);
    }

    fn flight_should_panic() -> bool {
        true
    }
}
