use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{db_types::PaymentMethod, traits::ExchangeRate};

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateError {
    #[error("Exchange rate backend error: {0}")]
    BackendError(String),
    #[error("The requested exchange rate does not exist: {0}")]
    RateDoesNotExist(String),
}

#[allow(async_fn_in_trait)]
pub trait ExchangeRates {
    /// Fetch the last exchange rate for the given currency. If the rate does not exist, the error
    /// [`ExchangeRateError::RateDoesNotExist`] is returned.
    async fn fetch_last_rate(&self, currency: PaymentMethod) -> Result<ExchangeRate, ExchangeRateError>;

    /// Fetch the last exchange rate for every currency that has one.
    async fn fetch_all_rates(&self) -> Result<Vec<ExchangeRate>, ExchangeRateError>;
}

/// A fixed rate table. Quotes are indicative only; the payment processor settles the actual amount.
#[derive(Debug, Clone)]
pub struct StaticExchangeRates {
    rates: HashMap<PaymentMethod, ExchangeRate>,
}

impl Default for StaticExchangeRates {
    fn default() -> Self {
        Self::new(&[
            (PaymentMethod::Bitcoin, Decimal::from(45_000)),
            (PaymentMethod::Ethereum, Decimal::from(3_000)),
            (PaymentMethod::Litecoin, Decimal::from(120)),
        ])
    }
}

impl StaticExchangeRates {
    pub fn new(rates: &[(PaymentMethod, Decimal)]) -> Self {
        let rates = rates.iter().map(|(m, r)| (*m, ExchangeRate::new(*m, *r))).collect();
        Self { rates }
    }

    pub fn with_rate(mut self, currency: PaymentMethod, usd_per_unit: Decimal) -> Self {
        self.rates.insert(currency, ExchangeRate::new(currency, usd_per_unit));
        self
    }
}

impl ExchangeRates for StaticExchangeRates {
    async fn fetch_last_rate(&self, currency: PaymentMethod) -> Result<ExchangeRate, ExchangeRateError> {
        self.rates.get(&currency).cloned().ok_or_else(|| ExchangeRateError::RateDoesNotExist(currency.to_string()))
    }

    async fn fetch_all_rates(&self) -> Result<Vec<ExchangeRate>, ExchangeRateError> {
        Ok(PaymentMethod::ALL.iter().filter_map(|m| self.rates.get(m).cloned()).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn default_rates() {
        let rates = StaticExchangeRates::default();
        let btc = rates.fetch_last_rate(PaymentMethod::Bitcoin).await.unwrap();
        assert_eq!(btc.usd_per_unit, Decimal::from(45_000));
        let all = rates.fetch_all_rates().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].currency, PaymentMethod::Litecoin);
    }

    #[tokio::test]
    async fn missing_rate() {
        let rates = StaticExchangeRates::new(&[(PaymentMethod::Bitcoin, Decimal::from(50_000))]);
        assert!(matches!(
            rates.fetch_last_rate(PaymentMethod::Ethereum).await,
            Err(ExchangeRateError::RateDoesNotExist(_))
        ));
        let rates = rates.with_rate(PaymentMethod::Ethereum, Decimal::from(2_500));
        assert_eq!(rates.fetch_last_rate(PaymentMethod::Ethereum).await.unwrap().usd_per_unit, Decimal::from(2_500));
    }
}
