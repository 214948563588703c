//! Fixed-size PostgreSQL connection pool.

use crate::error::QueryBenchError;
use std::ops::Deref;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_postgres::{Client, NoTls};
use tracing::info;

/// A pool of eagerly opened connections.
///
/// Every connection is opened up front; [`ConnectionPool::checkout`] waits
/// until one is free and the returned guard hands it back on drop.
pub struct ConnectionPool<C = Client> {
    clients: Mutex<Vec<C>>,
    permits: Semaphore,
    size: usize,
}

impl ConnectionPool<Client> {
    /// Open `size` connections concurrently. Fails if any of them fails.
    pub async fn connect(connection_string: &str, size: usize) -> Result<Self, QueryBenchError> {
        if size == 0 {
            return Err(QueryBenchError::EmptyPool);
        }

        let clients =
            futures::future::try_join_all((0..size).map(|_| connect_one(connection_string)))
                .await?;

        info!("Connection pool ready with {} connections", size);

        Self::from_clients(clients)
    }
}

impl<C> ConnectionPool<C> {
    /// Pool already opened clients.
    pub fn from_clients(clients: Vec<C>) -> Result<Self, QueryBenchError> {
        let size = clients.len();
        if size == 0 {
            return Err(QueryBenchError::EmptyPool);
        }

        Ok(Self {
            clients: Mutex::new(clients),
            permits: Semaphore::new(size),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of connections not currently checked out.
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a free connection.
    pub async fn checkout(&self) -> Result<PooledClient<'_, C>, QueryBenchError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| QueryBenchError::PoolClosed)?;

        // A permit guarantees a parked client.
        let client = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .ok_or(QueryBenchError::PoolClosed)?;

        Ok(PooledClient {
            pool: self,
            client: Some(client),
            _permit: permit,
        })
    }
}

async fn connect_one(connection_string: &str) -> Result<Client, QueryBenchError> {
    let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("PostgreSQL connection error: {}", e);
        }
    });

    Ok(client)
}

/// A checked-out connection. Returned to the pool when dropped.
pub struct PooledClient<'a, C = Client> {
    pool: &'a ConnectionPool<C>,
    client: Option<C>,
    _permit: SemaphorePermit<'a>,
}

impl<C> Deref for PooledClient<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        match &self.client {
            Some(client) => client,
            None => unreachable!("client is only taken on drop"),
        }
    }
}

impl<C> Drop for PooledClient<'_, C> {
    fn drop(&mut self) {
        // Park the client before the permit field is dropped.
        if let Some(client) = self.client.take() {
            self.pool
                .clients
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(client);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            ConnectionPool::<u32>::from_clients(Vec::new()),
            Err(QueryBenchError::EmptyPool)
        ));
    }

    #[tokio::test]
    async fn test_checkout_waits_for_a_returned_client() {
        let pool = ConnectionPool::from_clients(vec![1u32, 2]).unwrap();
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.idle(), 2);

        let first = pool.checkout().await.unwrap();
        let second = pool.checkout().await.unwrap();
        assert_eq!(pool.idle(), 0);
        let mut held = vec![*first, *second];
        held.sort_unstable();
        assert_eq!(held, vec![1, 2]);

        // All clients are out, so a third checkout has to wait.
        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.checkout()).await;
        assert!(blocked.is_err());

        let returned = *first;
        drop(first);
        assert_eq!(pool.idle(), 1);
        let third = tokio::time::timeout(Duration::from_secs(1), pool.checkout())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*third, returned);

        drop(third);
        drop(second);
        assert_eq!(pool.idle(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiting_checkout_resumes_on_drop() {
        let pool = std::sync::Arc::new(ConnectionPool::from_clients(vec!["only"]).unwrap());
        let guard = pool.checkout().await.unwrap();

        let waiter = {
            let pool = std::sync::Arc::clone(&pool);
            tokio::spawn(async move {
                let client = pool.checkout().await.unwrap();
                *client
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert_eq!(waiter.await.unwrap(), "only");
        assert_eq!(pool.idle(), 1);
    }
}
