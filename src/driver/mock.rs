//! mockall doubles for the driver traits, shared by unit tests.

use crate::driver::protocol::{Connection, DataSource, PreparedStatement, RowCursor};
use crate::error::DriverError;
use crate::types::Value;
use async_trait::async_trait;
use mockall::mock;
use std::time::Duration;

mock! {
    pub Source {}

    #[async_trait]
    impl DataSource for Source {
        async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError>;
    }
}

mock! {
    pub Conn {}

    #[async_trait]
    impl Connection for Conn {
        async fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>, DriverError>;
    }
}

mock! {
    pub Statement {}

    #[async_trait]
    impl PreparedStatement for Statement {
        fn set_query_timeout(&mut self, timeout: Option<Duration>);
        fn bind(&mut self, position: usize, value: Value) -> Result<(), DriverError>;
        async fn execute_query(&mut self) -> Result<Box<dyn RowCursor>, DriverError>;
        async fn execute_update(&mut self) -> Result<u64, DriverError>;
    }
}
