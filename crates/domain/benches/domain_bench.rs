use common::{ConsumerId, MenuItemId, RestaurantId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    InMemoryOrderRepository, LineItem, Money, NewOrder, Order, OrderRepository,
    OrderRepositoryExt, OrderStatus,
};

fn new_order(lines: usize) -> NewOrder {
    NewOrder {
        consumer_id: ConsumerId::new(1),
        consumer_name: "Asha".into(),
        consumer_contact: "+91999".into(),
        restaurant_id: RestaurantId::new(1),
        restaurant_name: "Dosa Point".into(),
        delivery_address: "12 MG Road".into(),
        payment_method: "CARD".into(),
        items: (0..lines)
            .map(|i| {
                LineItem::new(
                    MenuItemId::new(i as i64),
                    format!("Item {i}"),
                    Money::from_minor(250),
                    2,
                )
            })
            .collect(),
    }
}

fn bench_place_order(c: &mut Criterion) {
    c.bench_function("order/place_10_items", |b| {
        b.iter(|| Order::place(new_order(10)).unwrap());
    });
}

fn bench_converge(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("order/save_and_converge", |b| {
        b.iter(|| {
            rt.block_on(async {
                let repo = InMemoryOrderRepository::new();
                let mut order = Order::place(new_order(3)).unwrap();
                order.approve().unwrap();
                repo.save(&mut order).await.unwrap();
                repo.update_with(order.id(), |o| Ok(o.converge(OrderStatus::Preparing)))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_place_order, bench_converge);
criterion_main!(benches);
