//! Fans a product query out to every source the user has configured and
//! reconciles the answers.
//!
//! Each source runs under its own deadline, so one slow or failing source never
//! hides the others. Nothing is retried here.

mod model;

pub use model::*;

use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;

use crate::source::{FetchOutcome, PriceSource, SourceBuilder, SourceCredentials, SourceError, SourceKind};

use super::{CredentialVault, Entitlement, Feature, User, VaultError};

/// Configuration order. The storefront comes first, which also decides price ties.
const SOURCE_ORDER: [SourceKind; 2] = [SourceKind::WooCommerce, SourceKind::Torob];

pub fn required_feature(kind: SourceKind) -> Feature {
    match kind {
        SourceKind::WooCommerce => Feature::WooCommercePrice,
        SourceKind::Torob => Feature::TorobComparison,
    }
}

enum Planned {
    Query(Box<dyn PriceSource>),
    Corrupt(SourceKind),
}

#[derive(Clone)]
pub struct PriceAggregator {
    vault: CredentialVault,
    builder: Arc<dyn SourceBuilder>,
    timeout: Duration,
}

impl PriceAggregator {
    pub fn new(vault: CredentialVault, builder: Arc<dyn SourceBuilder>, timeout: Duration) -> Self {
        Self {
            vault,
            builder,
            timeout,
        }
    }

    /// Sources the user both holds credentials for and is entitled to.
    pub fn configured_sources(&self, user: &User, entitlement: &Entitlement) -> Vec<SourceKind> {
        SOURCE_ORDER
            .into_iter()
            .filter(|kind| entitlement.has(required_feature(*kind)))
            .filter(|kind| match kind {
                SourceKind::WooCommerce => user.has_storefront_credentials(),
                SourceKind::Torob => user.has_torob_credentials(),
            })
            .collect()
    }

    pub async fn compare(&self, user: &User, entitlement: &Entitlement, query: &str) -> ComparisonResult {
        let planned = self
            .configured_sources(user, entitlement)
            .into_iter()
            .map(|kind| match self.decrypt_credentials(user, kind) {
                Ok(credentials) => Planned::Query(self.builder.build(credentials)),
                Err(e) => {
                    warn!("Stored {} credentials of user {} are unreadable: {}", kind, user.telegram_id, e);
                    Planned::Corrupt(kind)
                }
            })
            .collect::<Vec<_>>();

        let reports = join_all(planned.iter().map(|plan| async move {
            match plan {
                Planned::Query(source) => self.query_source(source.as_ref(), query).await,
                Planned::Corrupt(kind) => SourceReport {
                    source: *kind,
                    outcome: SourceOutcome::CredentialsCorrupt,
                },
            }
        }))
        .await;

        let result = ComparisonResult {
            query: query.to_string(),
            reports,
        };
        info!("Compared {:?} for user {}: {:?}", query, user.telegram_id, result.status());
        result
    }

    async fn query_source(&self, source: &dyn PriceSource, query: &str) -> SourceReport {
        let kind = source.kind();
        let outcome = match timeout(self.timeout, source.fetch_price(query)).await {
            Ok(outcome) => outcome,
            Err(_) => FetchOutcome::TransientError(SourceError::Timeout(self.timeout)),
        };

        if let FetchOutcome::TransientError(e) = &outcome {
            warn!("{} unavailable for {:?}: {}", kind, query, e);
        }

        SourceReport {
            source: kind,
            outcome: outcome.into(),
        }
    }

    fn decrypt_credentials(&self, user: &User, kind: SourceKind) -> Result<SourceCredentials, VaultError> {
        let decrypt = |field: &Option<String>| -> Result<String, VaultError> {
            let envelope = field.as_deref().ok_or(VaultError::CorruptCredential)?;
            self.vault.decrypt(envelope)
        };

        match kind {
            SourceKind::WooCommerce => Ok(SourceCredentials::WooCommerce {
                store_url: user.store_url.clone().ok_or(VaultError::CorruptCredential)?,
                consumer_key: decrypt(&user.woo_api_key)?,
                consumer_secret: decrypt(&user.woo_api_secret)?,
            }),
            SourceKind::Torob => Ok(SourceCredentials::Torob {
                token: decrypt(&user.torob_api_key)?,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::{sync::Mutex, time::Instant};
    use teloxide::types::UserId;

    use crate::{
        service::{subscription::tests::test_catalog, Tier},
        source::PriceQuote,
    };

    #[derive(Clone)]
    pub(crate) enum Behaviour {
        Price(i64),
        Missing,
        Broken,
        Hang,
    }

    pub(crate) struct FakeSource {
        pub kind: SourceKind,
        pub behaviour: Behaviour,
    }

    #[async_trait]
    impl PriceSource for FakeSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch_price(&self, query: &str) -> FetchOutcome {
            match self.behaviour {
                Behaviour::Price(price) => FetchOutcome::Found(PriceQuote {
                    source: self.kind,
                    item_id: None,
                    name: format!("{query} @ {}", self.kind),
                    price: Decimal::from(price),
                    regular_price: None,
                    currency: "IRT".into(),
                    shop_name: None,
                }),
                Behaviour::Missing => FetchOutcome::NotFound,
                Behaviour::Broken => FetchOutcome::TransientError(SourceError::Status(500)),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    FetchOutcome::NotFound
                }
            }
        }
    }

    /// Builds fakes and records the credentials it was handed.
    #[derive(Default)]
    pub(crate) struct FakeBuilder {
        pub woo: Option<Behaviour>,
        pub torob: Option<Behaviour>,
        pub seen: Mutex<Vec<String>>,
    }

    impl SourceBuilder for FakeBuilder {
        fn build(&self, credentials: SourceCredentials) -> Box<dyn PriceSource> {
            let kind = credentials.kind();
            let seen = match &credentials {
                SourceCredentials::WooCommerce {
                    store_url,
                    consumer_key,
                    consumer_secret,
                } => format!("{store_url} {consumer_key} {consumer_secret}"),
                SourceCredentials::Torob { token } => token.clone(),
            };
            self.seen.lock().unwrap().push(seen);

            let behaviour = match kind {
                SourceKind::WooCommerce => self.woo.clone(),
                SourceKind::Torob => self.torob.clone(),
            };
            Box::new(FakeSource {
                kind,
                behaviour: behaviour.unwrap_or(Behaviour::Missing),
            })
        }
    }

    pub(crate) fn test_vault() -> CredentialVault {
        CredentialVault::from_key_bytes(&[9u8; 32]).unwrap()
    }

    fn user_with_credentials(vault: &CredentialVault) -> User {
        User {
            id: 1,
            telegram_id: UserId(100),
            username: "shop".into(),
            tier: Tier::Premium,
            subscription_end: None,
            is_active: true,
            store_url: Some("https://shop.example.com".into()),
            woo_api_key: Some(vault.encrypt("ck_key").unwrap()),
            woo_api_secret: Some(vault.encrypt("cs_secret").unwrap()),
            torob_api_key: Some(vault.encrypt("torob-token").unwrap()),
            created_at: Utc::now(),
        }
    }

    fn entitlement(tier: Tier) -> Entitlement {
        Entitlement {
            tier,
            features: test_catalog().features(tier).to_vec(),
            downgraded: false,
        }
    }

    fn aggregator(builder: FakeBuilder, timeout: Duration) -> (PriceAggregator, Arc<FakeBuilder>) {
        let builder = Arc::new(builder);
        (PriceAggregator::new(test_vault(), builder.clone(), timeout), builder)
    }

    async fn compare_with(woo: Behaviour, torob: Behaviour, timeout: Duration) -> ComparisonResult {
        let builder = FakeBuilder {
            woo: Some(woo),
            torob: Some(torob),
            ..Default::default()
        };
        let (aggregator, _) = aggregator(builder, timeout);
        let user = user_with_credentials(&test_vault());
        aggregator.compare(&user, &entitlement(Tier::Premium), "kettle").await
    }

    #[tokio::test]
    async fn test_slow_source_times_out_without_hiding_others() {
        let started = Instant::now();
        let result = compare_with(Behaviour::Price(1000), Behaviour::Hang, Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));

        assert_eq!(result.reports.len(), 2);
        assert!(matches!(&result.reports[0].outcome, SourceOutcome::Found(q) if q.price == Decimal::from(1000)));
        assert!(matches!(
            result.reports[1].outcome,
            SourceOutcome::Unavailable(SourceError::Timeout(_))
        ));
        assert_eq!(result.status(), ComparisonStatus::Partial);
        assert_eq!(result.cheapest().unwrap().source, SourceKind::WooCommerce);
    }

    #[tokio::test]
    async fn test_minimum_across_sources() {
        let result = compare_with(Behaviour::Price(12000), Behaviour::Price(9500), Duration::from_secs(1)).await;

        assert_eq!(result.status(), ComparisonStatus::Complete);
        let cheapest = result.cheapest().unwrap();
        assert_eq!(cheapest.source, SourceKind::Torob);
        assert_eq!(cheapest.price, Decimal::from(9500));
    }

    #[tokio::test]
    async fn test_failures_are_reported_per_source() {
        let result = compare_with(Behaviour::Missing, Behaviour::Broken, Duration::from_secs(1)).await;
        assert_eq!(result.status(), ComparisonStatus::Inconclusive);

        let result = compare_with(Behaviour::Broken, Behaviour::Broken, Duration::from_secs(1)).await;
        assert_eq!(result.status(), ComparisonStatus::Unavailable);

        let result = compare_with(Behaviour::Missing, Behaviour::Missing, Duration::from_secs(1)).await;
        assert_eq!(result.status(), ComparisonStatus::NothingFound);
    }

    #[tokio::test]
    async fn test_compare_decrypts_and_queries_in_order() {
        let builder = FakeBuilder {
            woo: Some(Behaviour::Price(12000)),
            torob: Some(Behaviour::Price(9500)),
            ..Default::default()
        };
        let (aggregator, builder) = aggregator(builder, Duration::from_secs(1));
        let user = user_with_credentials(&test_vault());

        let result = aggregator.compare(&user, &entitlement(Tier::Premium), "kettle").await;

        let order: Vec<_> = result.reports.iter().map(|r| r.source).collect();
        assert_eq!(order, vec![SourceKind::WooCommerce, SourceKind::Torob]);
        assert_eq!(
            *builder.seen.lock().unwrap(),
            vec!["https://shop.example.com ck_key cs_secret".to_string(), "torob-token".to_string()]
        );
        assert_eq!(result.cheapest().unwrap().source, SourceKind::Torob);
    }

    #[tokio::test]
    async fn test_entitlement_limits_sources() {
        let (aggregator, _) = aggregator(FakeBuilder::default(), Duration::from_secs(1));
        let user = user_with_credentials(&test_vault());

        // The basic tier has no Torob comparison.
        assert_eq!(
            aggregator.configured_sources(&user, &entitlement(Tier::Basic)),
            vec![SourceKind::WooCommerce]
        );

        let mut bare = user.clone();
        bare.store_url = None;
        bare.torob_api_key = None;
        let result = aggregator.compare(&bare, &entitlement(Tier::Premium), "kettle").await;
        assert_eq!(result.status(), ComparisonStatus::NoSources);
    }

    #[tokio::test]
    async fn test_corrupt_credentials_skip_only_that_source() {
        let builder = FakeBuilder {
            torob: Some(Behaviour::Price(9500)),
            ..Default::default()
        };
        let (aggregator, builder) = aggregator(builder, Duration::from_secs(1));

        // Encrypted under a different key, as after a lost vault key.
        let other_vault = CredentialVault::from_key_bytes(&[1u8; 32]).unwrap();
        let mut user = user_with_credentials(&test_vault());
        user.woo_api_secret = Some(other_vault.encrypt("cs_secret").unwrap());

        let result = aggregator.compare(&user, &entitlement(Tier::Premium), "kettle").await;

        assert!(matches!(result.reports[0].outcome, SourceOutcome::CredentialsCorrupt));
        assert!(matches!(result.reports[1].outcome, SourceOutcome::Found(_)));
        assert_eq!(result.status(), ComparisonStatus::Partial);
        assert_eq!(builder.seen.lock().unwrap().len(), 1);
    }
}
