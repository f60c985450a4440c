use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, header},
};
use futures_util::Stream;
use tracing::{debug, warn};

use crate::cache::models::CachedResponse;
use crate::cache::store::ResponseStore;

/// 响应缓存层：决定请求能否命中缓存，以及响应是否写入缓存
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn ResponseStore>,
    max_body_bytes: usize,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn ResponseStore>, max_body_bytes: usize) -> Self {
        Self {
            store,
            max_body_bytes,
        }
    }

    /// 只有 GET 参与缓存，其他方法既不查也不写
    pub fn participates(method: &Method) -> bool {
        method == Method::GET
    }

    pub fn is_cacheable(method: &Method, status: StatusCode) -> bool {
        Self::participates(method) && status == StatusCode::OK
    }

    /// 存储不可用按未命中处理
    pub async fn lookup(&self, key: &str) -> Option<CachedResponse> {
        match self.store.lookup(key).await {
            Ok(Some(hit)) => {
                debug!("cache hit: {}", key);
                Some(hit)
            }
            Ok(None) => {
                debug!("cache miss: {}", key);
                None
            }
            Err(e) => {
                warn!("response cache lookup failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// 满足条件时在后台写入缓存，不阻塞响应返回。返回是否已安排写入
    pub fn maybe_store(
        &self,
        key: String,
        method: &Method,
        status: StatusCode,
        headers: &HeaderMap,
        body: Vec<u8>,
    ) -> bool {
        if !Self::is_cacheable(method, status) || body.len() > self.max_body_bytes {
            return false;
        }

        let entry = CachedResponse::from_parts(status, headers, body);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.store(&key, entry).await {
                warn!("response cache write dropped for {}: {}", key, e);
            }
        });
        true
    }

    /// 源站响应体边转发边复制。只有流正常结束才写入缓存；
    /// 出错、被调用方丢弃或超过大小上限时丢弃副本
    pub fn tee<S, E>(
        &self,
        key: String,
        method: &Method,
        status: StatusCode,
        headers: &HeaderMap,
        stream: S,
    ) -> TeeStream<S>
    where
        S: Stream<Item = Result<Bytes, E>>,
    {
        let declared = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());

        let capture = match declared {
            _ if !Self::is_cacheable(method, status) => None,
            Some(len) if len > self.max_body_bytes => {
                debug!("response for {} too large to cache ({} bytes)", key, len);
                None
            }
            _ => Some(Capture {
                cache: self.clone(),
                key,
                method: method.clone(),
                status,
                headers: headers.clone(),
                buffer: Vec::with_capacity(declared.unwrap_or(0)),
            }),
        };

        TeeStream {
            inner: Box::pin(stream),
            capture,
        }
    }
}

struct Capture {
    cache: ResponseCache,
    key: String,
    method: Method,
    status: StatusCode,
    headers: HeaderMap,
    buffer: Vec<u8>,
}

impl Capture {
    fn commit(self) {
        self.cache
            .maybe_store(self.key, &self.method, self.status, &self.headers, self.buffer);
    }
}

/// [`ResponseCache::tee`] 返回的流，数据块原样透传
pub struct TeeStream<S> {
    inner: Pin<Box<S>>,
    capture: Option<Capture>,
}

impl<S, E> Stream for TeeStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(capture) = this.capture.as_mut() {
                    if capture.buffer.len() + chunk.len() > capture.cache.max_body_bytes {
                        debug!("response for {} exceeded cache size limit", capture.key);
                        this.capture = None;
                    } else {
                        capture.buffer.extend_from_slice(&chunk);
                    }
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.capture = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if let Some(capture) = this.capture.take() {
                    capture.commit();
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryResponseStore;
    use crate::cache::store::StoreError;
    use async_trait::async_trait;
    use futures_util::{StreamExt, stream};
    use std::io;

    const LIMIT: usize = 16;

    fn chunks(parts: &[&'static str]) -> Vec<Result<Bytes, io::Error>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect()
    }

    async fn settle(store: &MemoryResponseStore) {
        for _ in 0..100 {
            if !store.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ResponseStore for BrokenStore {
        async fn lookup(&self, _key: &str) -> Result<Option<CachedResponse>, StoreError> {
            Err(StoreError::Unavailable("connection reset".into()))
        }

        async fn store(&self, _key: &str, _response: CachedResponse) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection reset".into()))
        }
    }

    #[test]
    fn only_get_with_exact_200_is_cacheable() {
        assert!(ResponseCache::is_cacheable(&Method::GET, StatusCode::OK));
        assert!(!ResponseCache::is_cacheable(&Method::GET, StatusCode::CREATED));
        assert!(!ResponseCache::is_cacheable(&Method::GET, StatusCode::NO_CONTENT));
        assert!(!ResponseCache::is_cacheable(&Method::GET, StatusCode::NOT_FOUND));
        assert!(!ResponseCache::is_cacheable(&Method::POST, StatusCode::OK));
        assert!(!ResponseCache::is_cacheable(&Method::HEAD, StatusCode::OK));
    }

    #[tokio::test]
    async fn store_then_lookup() {
        let store = Arc::new(MemoryResponseStore::new(None));
        let cache = ResponseCache::new(store.clone(), LIMIT);

        let scheduled = cache.maybe_store(
            "GET /v1/models".into(),
            &Method::GET,
            StatusCode::OK,
            &HeaderMap::new(),
            b"[]".to_vec(),
        );
        assert!(scheduled);

        for _ in 0..100 {
            if !store.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let hit = cache.lookup("GET /v1/models").await.unwrap();
        assert_eq!(hit.body, b"[]");
    }

    #[tokio::test]
    async fn non_cacheable_responses_are_not_scheduled() {
        let store = Arc::new(MemoryResponseStore::new(None));
        let cache = ResponseCache::new(store.clone(), LIMIT);

        assert!(!cache.maybe_store(
            "GET /missing".into(),
            &Method::GET,
            StatusCode::NOT_FOUND,
            &HeaderMap::new(),
            Vec::new(),
        ));
        assert!(!cache.maybe_store(
            "POST /v1/races".into(),
            &Method::POST,
            StatusCode::OK,
            &HeaderMap::new(),
            Vec::new(),
        ));
        tokio::task::yield_now().await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_is_a_miss() {
        let cache = ResponseCache::new(Arc::new(BrokenStore), LIMIT);
        assert!(cache.lookup("GET /v1/models").await.is_none());
    }

    #[tokio::test]
    async fn tee_stores_body_once_stream_completes() {
        let store = Arc::new(MemoryResponseStore::new(None));
        let cache = ResponseCache::new(store.clone(), LIMIT);

        let mut tee = cache.tee(
            "GET /v1/races/123".into(),
            &Method::GET,
            StatusCode::OK,
            &HeaderMap::new(),
            stream::iter(chunks(&["{\"id\"", ":123}"])),
        );

        let first = tee.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"{\"id\"");
        tokio::task::yield_now().await;
        assert!(store.is_empty());

        let rest: Vec<_> = tee.collect().await;
        assert_eq!(rest.len(), 1);
        settle(&store).await;

        let hit = cache.lookup("GET /v1/races/123").await.unwrap();
        assert_eq!(hit.body, br#"{"id":123}"#);
    }

    #[tokio::test]
    async fn tee_discards_copy_when_stream_fails() {
        let store = Arc::new(MemoryResponseStore::new(None));
        let cache = ResponseCache::new(store.clone(), LIMIT);

        let mut items = chunks(&["hello"]);
        items.push(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "origin closed")));
        let delivered: Vec<_> = cache
            .tee(
                "GET /partial".into(),
                &Method::GET,
                StatusCode::OK,
                &HeaderMap::new(),
                stream::iter(items),
            )
            .collect()
            .await;

        assert!(delivered[0].is_ok());
        assert!(delivered[1].is_err());
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn tee_discards_copy_when_caller_goes_away() {
        let store = Arc::new(MemoryResponseStore::new(None));
        let cache = ResponseCache::new(store.clone(), LIMIT);

        let mut tee = cache.tee(
            "GET /abandoned".into(),
            &Method::GET,
            StatusCode::OK,
            &HeaderMap::new(),
            stream::iter(chunks(&["one", "two"])),
        );
        tee.next().await;
        drop(tee);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn tee_passes_oversized_bodies_through_without_caching() {
        let store = Arc::new(MemoryResponseStore::new(None));
        let cache = ResponseCache::new(store.clone(), LIMIT);

        let delivered: Vec<_> = cache
            .tee(
                "GET /big".into(),
                &Method::GET,
                StatusCode::OK,
                &HeaderMap::new(),
                stream::iter(chunks(&["0123456789", "0123456789"])),
            )
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(delivered.concat(), b"01234567890123456789");

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, "1000".parse().unwrap());
        let declared: Vec<_> = cache
            .tee(
                "GET /declared-big".into(),
                &Method::GET,
                StatusCode::OK,
                &headers,
                stream::iter(chunks(&["small"])),
            )
            .collect()
            .await;
        assert_eq!(declared.len(), 1);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(store.is_empty());
    }
}
