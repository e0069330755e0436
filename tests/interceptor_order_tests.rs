//! Chain assembly ordering guarantees.
//!
//! Interceptors register from two uncoordinated sites: the builder
//! (construction-time appends) and customizers (post-construction edits at
//! arbitrary indices). These tests pin down the one rule both sites live
//! under: the trace interceptor ends up first, every time.

use std::sync::Arc;

use assert2::check;
use wiretap::{Chain, ClientCustomizer, HyperClient, InterceptFuture, Interceptor, InterceptorId, Next, Request};

struct PassThrough(&'static str);

impl Interceptor for PassThrough {
    fn name(&self) -> &str {
        self.0
    }

    fn intercept(&self, request: Request, next: Next) -> InterceptFuture<'_> {
        next.run(request)
    }
}

fn user(name: &'static str) -> Arc<dyn Interceptor> {
    Arc::new(PassThrough(name))
}

/// A hook that inserts at index 0 still ends up behind the trace interceptor.
#[test]
fn hook_insert_at_zero_never_outranks_trace() {
    let trace = user("trace-marker");
    let u1 = user("u1");
    let u2 = user("u2");

    let client = HyperClient::builder()
        .trace_interceptor(Arc::clone(&trace))
        .interceptors_from([Arc::clone(&u1)])
        .customizer({
            let u2 = Arc::clone(&u2);
            move |chain: &mut Chain| chain.insert(0, Arc::clone(&u2))
        })
        .build();

    let expected = vec![
        InterceptorId::of(&trace),
        InterceptorId::of(&u2),
        InterceptorId::of(&u1),
    ];
    check!(client.effective_order() == expected);
}

#[test]
fn default_trace_interceptor_leads_the_chain() {
    let client = HyperClient::builder()
        .interceptor(PassThrough("u1"))
        .customizer(|chain: &mut Chain| chain.insert(0, Arc::new(PassThrough("u2"))))
        .build();

    check!(client.interceptor_names() == vec!["trace", "u2", "u1"]);
}

/// Without any customizer the chain is exactly the construction order.
#[test]
fn construction_only_chain_keeps_call_order() {
    let client = HyperClient::builder()
        .interceptor(PassThrough("u1"))
        .interceptor(PassThrough("u2"))
        .interceptor(PassThrough("u3"))
        .build();

    check!(client.interceptor_names() == vec!["trace", "u1", "u2", "u3"]);
}

#[test]
fn empty_registration_is_a_no_op() {
    let client = HyperClient::builder().interceptors_from([]).build();

    check!(client.interceptor_names() == vec!["trace"]);
}

#[test]
fn effective_order_query_is_idempotent() {
    let client = HyperClient::builder()
        .interceptor(PassThrough("u1"))
        .customizer(|chain: &mut Chain| chain.insert(0, Arc::new(PassThrough("u2"))))
        .build();

    let first = client.effective_order();
    let second = client.effective_order();
    check!(first == second);
}

/// One shared customizer, two clients: each chain assembles independently and
/// each keeps its own trace interceptor first.
#[test]
fn clients_assemble_independently() {
    let late_insert: Arc<dyn ClientCustomizer> = Arc::new(|chain: &mut Chain| {
        chain.insert(0, Arc::new(PassThrough("late")));
    });

    let first = HyperClient::builder()
        .interceptor(PassThrough("first-own"))
        .shared_customizer(Arc::clone(&late_insert))
        .build();
    let second = HyperClient::builder()
        .interceptor(PassThrough("second-own"))
        .shared_customizer(Arc::clone(&late_insert))
        .build();

    check!(first.interceptor_names() == vec!["trace", "late", "first-own"]);
    check!(second.interceptor_names() == vec!["trace", "late", "second-own"]);

    // No identity is shared between the two chains.
    let second_order = second.effective_order();
    for id in first.effective_order() {
        check!(!second_order.contains(&id));
    }

    // Editing one client leaves the other untouched.
    first.customize(|chain| chain.insert(0, Arc::new(PassThrough("first-extra"))));
    check!(second.interceptor_names() == vec!["trace", "late", "second-own"]);
}

/// Interior insertion indices are honored relative to the whole chain; an
/// out-of-range index appends.
#[test]
fn hook_insert_at_interior_index_is_honored() {
    let client = HyperClient::builder()
        .interceptor(PassThrough("u1"))
        .interceptor(PassThrough("u2"))
        .build();

    client.customize(|chain| chain.insert(2, Arc::new(PassThrough("mid"))));
    check!(client.interceptor_names() == vec!["trace", "u1", "mid", "u2"]);

    client.customize(|chain| chain.insert(99, Arc::new(PassThrough("tail"))));
    check!(client.interceptor_names() == vec!["trace", "u1", "mid", "u2", "tail"]);
}

/// `customize` on an already-built client is a registration site like any
/// other: the invariant holds after it returns.
#[test]
fn late_customize_keeps_trace_first() {
    let trace = user("trace-marker");
    let client = HyperClient::builder()
        .trace_interceptor(Arc::clone(&trace))
        .interceptor(PassThrough("u1"))
        .build();

    client.customize(|chain| chain.insert(0, Arc::new(PassThrough("u2"))));

    let order = client.effective_order();
    check!(order.first() == Some(&InterceptorId::of(&trace)));
    check!(order.len() == 3);
}

#[test]
fn removing_a_user_interceptor_keeps_trace_first() {
    let u1 = user("u1");
    let client = HyperClient::builder()
        .interceptors_from([Arc::clone(&u1)])
        .interceptor(PassThrough("u2"))
        .build();

    client.customize(|chain| {
        chain.remove(InterceptorId::of(&u1));
    });

    check!(client.interceptor_names() == vec!["trace", "u2"]);
}

#[test]
#[should_panic(expected = "trace interceptor cannot be removed")]
fn removing_the_trace_interceptor_fails_loudly() {
    let client = HyperClient::builder()
        .interceptor(PassThrough("u1"))
        .build();

    client.customize(|chain| {
        let trace_id = chain.trace_id();
        chain.remove(trace_id);
    });
}
