use std::collections::HashMap;

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::{Credentials, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use plusplus_core::config::DynamoDbConfig;
use plusplus_core::points::{PointRecord, PointStore, StoreError};

use super::RepositoryError;

const KEY_ATTRIBUTE: &str = "user_id";
const POINTS_ATTRIBUTE: &str = "points";
const IS_USER_ATTRIBUTE: &str = "is_user";
const LAST_MODIFIED_ATTRIBUTE: &str = "last_modified";

/// DynamoDB-backed point store.
///
/// Increments use a single `UpdateItem` with an `ADD` action, which DynamoDB
/// applies atomically and which creates the item when it does not exist yet.
/// Reads are strongly consistent so a read right after a write sees it.
pub struct DynamoPointStore {
    client: Client,
    table_name: String,
}

fn dynamo_error<E>(error: E) -> RepositoryError
where
    E: std::error::Error,
{
    RepositoryError::Dynamo(DisplayErrorContext(error).to_string())
}

impl DynamoPointStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self { client, table_name: table_name.into() }
    }

    pub async fn connect(config: &DynamoDbConfig) -> Result<Self, RepositoryError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if config.local {
            info!(event_name = "store.dynamodb.local", "using local DynamoDB instance");
            loader = loader
                .region(Region::new("dummy"))
                .credentials_provider(Credentials::new("dummy", "dummy", None, None, "local"));
        } else {
            info!(event_name = "store.dynamodb.aws", "using AWS DynamoDB service");
            if let Some(region) = &config.region {
                loader = loader.region(Region::new(region.clone()));
            }
        }
        if let Some(endpoint_url) = config.effective_endpoint() {
            loader = loader.endpoint_url(endpoint_url);
        }

        let store = Self::new(Client::new(&loader.load().await), config.table_name.clone());
        if config.local {
            store.ensure_table().await?;
        }
        Ok(store)
    }

    /// Creates the table when `DescribeTable` cannot find it.
    pub async fn ensure_table(&self) -> Result<(), RepositoryError> {
        if self.client.describe_table().table_name(&self.table_name).send().await.is_ok() {
            return Ok(());
        }

        info!(
            event_name = "store.dynamodb.create_table",
            table_name = %self.table_name,
            "table does not exist; creating"
        );
        self.client
            .create_table()
            .table_name(&self.table_name)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(KEY_ATTRIBUTE)
                    .key_type(KeyType::Hash)
                    .build()
                    .map_err(dynamo_error)?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(KEY_ATTRIBUTE)
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .map_err(dynamo_error)?,
            )
            .provisioned_throughput(
                ProvisionedThroughput::builder()
                    .read_capacity_units(10)
                    .write_capacity_units(10)
                    .build()
                    .map_err(dynamo_error)?,
            )
            .send()
            .await
            .map_err(dynamo_error)?;
        Ok(())
    }

    async fn fetch_item(
        &self,
        key: &str,
    ) -> Result<Option<HashMap<String, AttributeValue>>, RepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, AttributeValue::S(key.to_owned()))
            .consistent_read(true)
            .send()
            .await
            .map_err(dynamo_error)?;
        Ok(output.item().cloned())
    }
}

fn points_from_item(item: &HashMap<String, AttributeValue>) -> Result<i64, RepositoryError> {
    match item.get(POINTS_ATTRIBUTE) {
        None => Ok(0),
        Some(AttributeValue::N(raw)) => raw
            .parse::<i64>()
            .map_err(|error| RepositoryError::Decode(format!("points `{raw}`: {error}"))),
        Some(other) => Err(RepositoryError::Decode(format!("points is not a number: {other:?}"))),
    }
}

fn record_from_item(
    key: &str,
    item: &HashMap<String, AttributeValue>,
) -> Result<PointRecord, RepositoryError> {
    let points = points_from_item(item)?;
    let is_user = matches!(item.get(IS_USER_ATTRIBUTE), Some(AttributeValue::Bool(true)));
    let last_modified = match item.get(LAST_MODIFIED_ATTRIBUTE) {
        Some(AttributeValue::S(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|error| RepositoryError::Decode(format!("last_modified `{raw}`: {error}")))?,
        _ => DateTime::<Utc>::UNIX_EPOCH,
    };

    Ok(PointRecord { key: key.to_owned(), points, is_user, last_modified })
}

#[async_trait::async_trait]
impl PointStore for DynamoPointStore {
    async fn add_points(&self, key: &str, delta: i64, is_user: bool) -> Result<(), StoreError> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, AttributeValue::S(key.to_owned()))
            .update_expression("ADD #points :delta SET #is_user = :is_user, #last_modified = :now")
            .expression_attribute_names("#points", POINTS_ATTRIBUTE)
            .expression_attribute_names("#is_user", IS_USER_ATTRIBUTE)
            .expression_attribute_names("#last_modified", LAST_MODIFIED_ATTRIBUTE)
            .expression_attribute_values(":delta", AttributeValue::N(delta.to_string()))
            .expression_attribute_values(":is_user", AttributeValue::Bool(is_user))
            .expression_attribute_values(":now", AttributeValue::S(Utc::now().to_rfc3339()))
            .send()
            .await
            .map_err(dynamo_error)?;

        debug!(event_name = "store.dynamodb.points_added", key, delta, is_user, "points updated");
        Ok(())
    }

    async fn get_points(&self, key: &str) -> Result<i64, StoreError> {
        match self.fetch_item(key).await? {
            Some(item) => Ok(points_from_item(&item)?),
            None => Ok(0),
        }
    }

    async fn find_record(&self, key: &str) -> Result<Option<PointRecord>, StoreError> {
        let item = self.fetch_item(key).await?;
        Ok(item.map(|item| record_from_item(key, &item)).transpose()?)
    }

    async fn close(&self) -> Result<(), StoreError> {
        // the SDK client holds no connection that needs explicit teardown
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aws_sdk_dynamodb::types::AttributeValue;

    use super::{points_from_item, record_from_item};

    fn item(pairs: &[(&str, AttributeValue)]) -> HashMap<String, AttributeValue> {
        pairs.iter().map(|(name, value)| ((*name).to_owned(), value.clone())).collect()
    }

    #[test]
    fn decodes_a_full_item() {
        let record = record_from_item(
            "U1",
            &item(&[
                ("user_id", AttributeValue::S("U1".to_owned())),
                ("points", AttributeValue::N("-4".to_owned())),
                ("is_user", AttributeValue::Bool(true)),
                ("last_modified", AttributeValue::S("2025-03-01T12:00:00Z".to_owned())),
            ]),
        )
        .expect("decodes");

        assert_eq!(record.key, "U1");
        assert_eq!(record.points, -4);
        assert!(record.is_user);
        assert_eq!(record.last_modified.to_rfc3339(), "2025-03-01T12:00:00+00:00");
    }

    #[test]
    fn missing_points_read_as_zero() {
        assert_eq!(points_from_item(&item(&[])).expect("decodes"), 0);
    }

    #[test]
    fn non_numeric_points_are_a_decode_error() {
        let result = points_from_item(&item(&[("points", AttributeValue::S("many".to_owned()))]));
        assert!(result.is_err());
    }
}
