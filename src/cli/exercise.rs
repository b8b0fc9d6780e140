use std::io::{BufRead, Write};

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    tracker::{
        canvas::TextCanvas,
        entities::TestType,
        session::{TestSession, TestState},
        storage::KeyValueStorage,
        store::EntryStore,
    },
    utils::clock::DefaultClock,
};

use super::{output::print_test_result, shutdown::detect_shutdown};

#[derive(Debug, Parser)]
pub struct TestCommand {
    #[arg(long = "type", short, value_enum, default_value_t = TestType::Drawing, help = "Test to start with")]
    test: TestType,
}

/// Runs time perception tests interactively using stdin. Results are written into the draft.
pub async fn process_test_command<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    TestCommand { test }: TestCommand,
) -> Result<()> {
    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));

    let lines = read_lines(std::io::BufReader::new(std::io::stdin()));
    let session = TestSession::new(test, TextCanvas::new(), Box::new(DefaultClock));
    let result = run_tests(store, session, lines, &shutdown, &mut std::io::stdout()).await;
    // Stops the signal listener
    shutdown.cancel();
    result
}

type LineReceiver = mpsc::UnboundedReceiver<std::io::Result<String>>;

/// Reads lines on a thread of its own. Blocking reads can't be interrupted, so the thread is
/// never joined and the process may exit while it waits.
fn read_lines<R: BufRead + Send + 'static>(reader: R) -> LineReceiver {
    let (sender, receiver) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if sender.send(line).is_err() || failed {
                break;
            }
        }
    });
    receiver
}

enum Input {
    Line(String),
    Closed,
    Cancelled,
}

async fn next_input(lines: &mut LineReceiver, shutdown: &CancellationToken) -> Result<Input> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => Ok(Input::Cancelled),
        line = lines.recv() => match line {
            Some(line) => Ok(Input::Line(line?)),
            None => Ok(Input::Closed),
        },
    }
}

fn describe(out: &mut impl Write, test: TestType) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", ansi_term::Style::new().bold().paint(test.title()))?;
    writeln!(out, "{}", test.instructions())?;
    if let Some(prompt) = test.prompt() {
        writeln!(out, "{}", ansi_term::Style::new().italic().paint(prompt))?;
    }
    writeln!(out, "Target time: {} seconds", test.target_seconds())?;
    let hint = match test {
        TestType::Drawing => "Type lines to draw, press Enter on an empty line when you think time's up.",
        TestType::Tapping => "Press Enter after any key to tap, Enter on an empty line when you think time's up.",
        TestType::Counting | TestType::Meditation => "Press Enter when you think time's up.",
    };
    writeln!(out, "{hint}")?;
    write!(out, "Press Enter to start, q to quit: ")?;
    out.flush()
}

/// Drives the session from input lines. Leaves on quit, closed input, or cancellation, which
/// abandons a running test without touching the store.
async fn run_tests<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    mut session: TestSession<TextCanvas>,
    mut lines: LineReceiver,
    shutdown: &CancellationToken,
    out: &mut impl Write,
) -> Result<()> {
    loop {
        describe(out, session.test())?;
        match next_input(&mut lines, shutdown).await? {
            Input::Line(line) if line.trim().eq_ignore_ascii_case("q") => return Ok(()),
            Input::Line(_) => {}
            Input::Closed | Input::Cancelled => return Ok(()),
        }

        session.start();
        writeln!(out, "Started.")?;

        while matches!(session.state(), TestState::Running { .. }) {
            match next_input(&mut lines, shutdown).await? {
                Input::Line(line) if line.trim().is_empty() => {
                    let Some(outcome) = session.stop() else {
                        break;
                    };
                    store.update_current_entry(outcome.to_patch()).await?;
                    print_test_result(out, &outcome)?;
                }
                Input::Line(line) => match session.test() {
                    TestType::Drawing => session.canvas_mut().draw_line(&line),
                    TestType::Tapping => {
                        session.tap();
                        writeln!(out, "{} taps", session.taps())?;
                    }
                    TestType::Counting | TestType::Meditation => {}
                },
                Input::Closed | Input::Cancelled => {
                    session.abandon();
                    writeln!(out, "Test abandoned.")?;
                    return Ok(());
                }
            }
        }

        write!(out, "Try a different test? [y = next, r = repeat, anything else = done]: ")?;
        out.flush()?;
        match next_input(&mut lines, shutdown).await? {
            Input::Line(line) => match line.trim() {
                "y" | "Y" => {
                    let next = session.next_test();
                    info!("Switched to {next} test");
                }
                "r" | "R" => {}
                _ => return Ok(()),
            },
            Input::Closed | Input::Cancelled => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tempfile::tempdir;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        cli::exercise::{read_lines, run_tests},
        tracker::{
            canvas::{has_strokes, TextCanvas},
            create_file_store,
            entities::TestType,
            session::TestSession,
        },
        utils::clock::DefaultClock,
    };

    fn session(test: TestType) -> TestSession<TextCanvas> {
        TestSession::new(test, TextCanvas::new(), Box::new(DefaultClock))
    }

    #[tokio::test(start_paused = true)]
    async fn test_drawing_then_next_test() -> Result<()> {
        let dir = tempdir()?;
        let mut store = create_file_store(dir.path())?;
        store.rehydrate().await;

        // start, draw two lines, stop, go to next test, start, stop, done
        let input: &[u8] = b"\n /\\ \n \\/ \n\ny\n\n\nn\n";
        let mut out = Vec::new();
        run_tests(
            &mut store,
            session(TestType::Drawing),
            read_lines(input),
            &CancellationToken::new(),
            &mut out,
        )
        .await?;

        let draft = store.current_entry()?;
        let perception = draft.time_perception.as_ref().unwrap();
        assert_eq!(perception.test_type, TestType::Counting);
        assert_eq!(perception.perceived, 20.);
        // The counting test replaced the drawing of the first test
        assert_eq!(draft.drawing, None);

        let text = String::from_utf8(out)?;
        assert!(text.contains("Drawing Test"));
        assert!(text.contains("Counting Test"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_drawing_kept() -> Result<()> {
        let dir = tempdir()?;
        let mut store = create_file_store(dir.path())?;
        store.rehydrate().await;

        let input: &[u8] = b"\n***\n\nn\n";
        run_tests(
            &mut store,
            session(TestType::Drawing),
            read_lines(input),
            &CancellationToken::new(),
            &mut Vec::new(),
        )
        .await?;

        let drawing = store.current_entry()?.drawing.clone().unwrap();
        assert!(has_strokes(&drawing));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_leaves_draft_alone() -> Result<()> {
        let dir = tempdir()?;
        let mut store = create_file_store(dir.path())?;
        store.rehydrate().await;

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let input: &[u8] = b"\n\n";
        run_tests(
            &mut store,
            session(TestType::Tapping),
            read_lines(input),
            &shutdown,
            &mut Vec::new(),
        )
        .await?;

        assert!(store.current_entry()?.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_input_abandons() -> Result<()> {
        let dir = tempdir()?;
        let mut store = create_file_store(dir.path())?;
        store.rehydrate().await;

        // Started, tapped twice, then input ends without a stop
        let input: &[u8] = b"\nx\nx\n";
        let mut out = Vec::new();
        run_tests(
            &mut store,
            session(TestType::Tapping),
            read_lines(input),
            &CancellationToken::new(),
            &mut out,
        )
        .await?;

        assert!(store.current_entry()?.time_perception.is_none());
        let text = String::from_utf8(out)?;
        assert!(text.contains("2 taps"));
        assert!(text.contains("Test abandoned."));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting_for_input() -> Result<()> {
        let dir = tempdir()?;
        let mut store = create_file_store(dir.path())?;
        store.rehydrate().await;

        // Input stays open after the start, as a terminal would
        let (sender, receiver) = mpsc::unbounded_channel();
        sender.send(Ok(String::new()))?;
        let shutdown = CancellationToken::new();
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        });

        let mut out = Vec::new();
        run_tests(
            &mut store,
            session(TestType::Counting),
            receiver,
            &shutdown,
            &mut out,
        )
        .await?;
        drop(sender);

        assert!(store.current_entry()?.time_perception.is_none());
        assert!(String::from_utf8(out)?.contains("Test abandoned."));
        Ok(())
    }

    #[test]
    fn test_read_lines_closes_at_end_of_input() {
        let input: &[u8] = b"first\nsecond\n";
        let mut lines = read_lines(input);
        assert_eq!(lines.blocking_recv().unwrap().unwrap(), "first");
        assert_eq!(lines.blocking_recv().unwrap().unwrap(), "second");
        assert!(lines.blocking_recv().is_none());
    }
}
