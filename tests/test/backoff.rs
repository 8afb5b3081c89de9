//local shortcuts
use callwire::*;

//third-party shortcuts

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------
//-------------------------------------------------------------------------------------------------------------------

#[test]
fn delays_double_up_to_the_cap()
{
    let mut backoff = ReconnectBackoff::new(BackoffConfig::default());

    let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay())
        .map(|delay| delay.as_secs())
        .collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30, 30, 30]);
    assert_eq!(backoff.attempts(), 10);

    // exhausted
    assert_eq!(backoff.next_delay(), None);
    assert_eq!(backoff.attempts(), 10);
}

//-------------------------------------------------------------------------------------------------------------------

#[test]
fn reset_starts_over()
{
    let mut backoff = ReconnectBackoff::new(BackoffConfig::default());
    backoff.next_delay();
    backoff.next_delay();
    assert_eq!(backoff.peek_delay(), Duration::from_secs(4));

    backoff.reset();
    assert_eq!(backoff.attempts(), 0);
    assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
}

//-------------------------------------------------------------------------------------------------------------------

#[test]
fn unlimited_attempts()
{
    let mut backoff = ReconnectBackoff::new(BackoffConfig{
            initial_delay : Duration::from_millis(100),
            max_delay     : Duration::from_millis(500),
            max_attempts  : None,
        });

    let mut last = Duration::ZERO;
    for _ in 0..1000
    {
        let delay = backoff.next_delay().unwrap();
        assert!(delay >= last);
        assert!(delay <= Duration::from_millis(500));
        last = delay;
    }
    assert_eq!(last, Duration::from_millis(500));
}

//-------------------------------------------------------------------------------------------------------------------

#[test]
fn initial_delay_above_cap_is_clamped()
{
    let mut backoff = ReconnectBackoff::new(BackoffConfig{
            initial_delay : Duration::from_secs(60),
            max_delay     : Duration::from_secs(5),
            max_attempts  : Some(2),
        });
    assert_eq!(backoff.next_delay(), Some(Duration::from_secs(5)));
    assert_eq!(backoff.next_delay(), Some(Duration::from_secs(5)));
    assert_eq!(backoff.next_delay(), None);
}

//-------------------------------------------------------------------------------------------------------------------
