use giftcard_engine::{
    db_types::{DeliveryUpdate, GiftCard, NewOrder, Order, OrderId, OrderStatusType, PaymentMethod},
    traits::{
        CardRequest,
        ExchangeRate,
        ExchangeRateError,
        ExchangeRates,
        GiftCardNotifier,
        GiftCardProvider,
        NotifierError,
        OrderQueryFilter,
        OrderStore,
        OrderStoreError,
        OrderSummary,
        ProviderError,
    },
};
use mockall::mock;

mock! {
    pub Store {}
    impl OrderStore for Store {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_session_id(&self, session_id: &str) -> Result<Option<Order>, OrderStoreError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderStoreError>;
        async fn transition_status(&self, order_id: &OrderId, from: OrderStatusType, to: OrderStatusType) -> Result<Option<Order>, OrderStoreError>;
        async fn record_gift_card(&self, order_id: &OrderId, index: usize, card: &GiftCard) -> Result<Order, OrderStoreError>;
        async fn record_item_error(&self, order_id: &OrderId, index: usize, error: &str) -> Result<Order, OrderStoreError>;
        async fn record_delivery(&self, order_id: &OrderId, update: DeliveryUpdate) -> Result<Order, OrderStoreError>;
    }
}

mock! {
    pub Rates {}
    impl ExchangeRates for Rates {
        async fn fetch_last_rate(&self, currency: PaymentMethod) -> Result<ExchangeRate, ExchangeRateError>;
        async fn fetch_all_rates(&self) -> Result<Vec<ExchangeRate>, ExchangeRateError>;
    }
}

mock! {
    pub Provider {}
    impl GiftCardProvider for Provider {
        async fn purchase_card(&self, request: &CardRequest) -> Result<GiftCard, ProviderError>;
    }
}

mock! {
    pub Notifier {}
    impl GiftCardNotifier for Notifier {
        async fn deliver(&self, recipient: &str, summary: &OrderSummary) -> Result<(), NotifierError>;
    }
}
