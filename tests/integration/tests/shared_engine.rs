//! One engine instance serving many threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use eidas_saml_engine::ErrorCode;

use crate::common::{corrupt, request, response_to, Federation, CONNECTOR, USER_IP};

const THREADS: usize = 8;
const ROUNDS: usize = 6;

#[test]
fn concurrent_exchanges_are_independent() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let connector = Arc::new(federation.connector()?);
    let proxy = Arc::new(federation.proxy()?);
    let rejected = AtomicUsize::new(0);

    thread::scope(|scope| {
        for worker in 0..THREADS {
            let connector = Arc::clone(&connector);
            let proxy = Arc::clone(&proxy);
            let rejected = &rejected;
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let message = connector
                        .generate_request_message(Some(&request()), CONNECTOR)
                        .expect("request generated");

                    if (worker + round) % 2 == 1 {
                        let corrupted = corrupt(message.bytes(), "Tax portal");
                        let err = proxy
                            .unmarshall_request_and_validate(&corrupted, None)
                            .expect_err("corrupted request rejected");
                        assert_eq!(err.code(), ErrorCode::InvalidSignature);
                        rejected.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }

                    let received = proxy
                        .unmarshall_request_and_validate(message.bytes(), None)
                        .expect("request accepted");
                    assert_eq!(received.id(), message.message().id());

                    let response = proxy
                        .generate_response_message(&received, &response_to(&received), true, Some(USER_IP))
                        .expect("response generated");
                    let result = connector
                        .unmarshall_response_and_validate(response.bytes(), Some(USER_IP), 0, Some(CONNECTOR))
                        .expect("response accepted");
                    assert_eq!(result.in_response_to(), received.id());
                }
            });
        }
    });

    assert_eq!(rejected.load(Ordering::Relaxed), THREADS * ROUNDS / 2);
    Ok(())
}
