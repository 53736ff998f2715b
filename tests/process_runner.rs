//! Process runner against real child processes.
#![cfg(unix)]

use std::time::{Duration, Instant};

use tpcheck::{FixtureExecutor, Invocation, ProcessRunner, RunError};

/// Several times larger than any pipe buffer.
fn large_fixture() -> String {
    let line = "int x; // padding padding padding padding padding padding\n";
    line.repeat((4 << 20) / line.len())
}

#[test]
fn large_fixture_does_not_deadlock_on_stdout() {
    let input = large_fixture();
    let result = ProcessRunner::with_timeout(Duration::from_secs(30))
        .execute(&Invocation::new("cat"), &input)
        .unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout.len(), input.len());
    assert!(result.stderr.is_empty());
}

#[test]
fn large_fixture_does_not_deadlock_on_stderr() {
    let input = large_fixture();
    let inv = Invocation::new("/bin/sh").with_flags(["-c", "cat >&2; exit 2"]);
    let result = ProcessRunner::with_timeout(Duration::from_secs(30))
        .execute(&inv, &input)
        .unwrap();
    assert_eq!(result.exit_code, 2);
    assert_eq!(result.stderr, input);
}

#[test]
fn child_that_ignores_its_input_is_a_broken_pipe() {
    let inv = Invocation::new("/bin/sh").with_flags(["-c", "exit 0"]);
    let err = ProcessRunner::new().execute(&inv, &large_fixture()).unwrap_err();
    assert!(matches!(err, RunError::BrokenPipe { .. }), "{err:?}");
}

#[test]
fn hanging_child_times_out() {
    let inv = Invocation::new("sleep").with_flags(["30"]);
    let start = Instant::now();
    let err = ProcessRunner::with_timeout(Duration::from_millis(200))
        .execute(&inv, "")
        .unwrap_err();
    assert!(matches!(err, RunError::Timeout { .. }), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn forked_grandchild_does_not_outlive_timeout() {
    // The shell forks `sleep`, which inherits the output pipes.
    let inv = Invocation::new("/bin/sh").with_flags(["-c", "sleep 30; true"]);
    let start = Instant::now();
    let err = ProcessRunner::with_timeout(Duration::from_millis(200))
        .execute(&inv, "")
        .unwrap_err();
    assert!(matches!(err, RunError::Timeout { .. }), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(5), "returned after {:?}", start.elapsed());
}

#[test]
fn background_descendant_holding_output_is_bounded() {
    // The child exits at once; its background job keeps stdout and stderr open.
    let inv = Invocation::new("/bin/sh").with_flags(["-c", "cat > /dev/null; sleep 30 & exit 0"]);
    let start = Instant::now();
    let err = ProcessRunner::with_timeout(Duration::from_millis(300))
        .execute(&inv, "int x;\n")
        .unwrap_err();
    assert!(matches!(err, RunError::Timeout { .. }), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(5), "returned after {:?}", start.elapsed());
}

#[test]
fn prefix_runs_before_executable() {
    // `env` stands in for an instrumentation wrapper: it runs the rest of its argument list.
    let inv = Invocation::new("/bin/sh")
        .with_prefix(["env", "TPCHECK_WRAPPED=1"])
        .with_flags(["-c", "cat > /dev/null; echo \"error: wrapped=$TPCHECK_WRAPPED\" >&2; exit 1"]);
    let result = ProcessRunner::new().execute(&inv, "x").unwrap();
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.stderr, "error: wrapped=1\n");
}

#[test]
fn executor_is_shareable_across_threads() {
    let runner = ProcessRunner::with_timeout(Duration::from_secs(30));
    let inv = Invocation::new("/bin/sh").with_flags(["-c", "cat; echo 'warning: w' >&2"]);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let (runner, inv) = (&runner, &inv);
                scope.spawn(move || runner.execute(inv, &format!("fixture {i}")).unwrap())
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.join().unwrap();
            assert_eq!(result.stdout, format!("fixture {i}"));
            assert_eq!(result.stderr, "warning: w\n");
        }
    });
}
