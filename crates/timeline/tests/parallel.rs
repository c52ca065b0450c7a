use std::thread;

use timeline::{reconstruct, NoteEvent, ReconstructError, Signal};

fn good_stream() -> Vec<Signal> {
    vec![
        Signal::onset(0.0, 60, 100),
        Signal::onset(1.0, 62, 90),
        Signal::offset(1.0, 60),
        Signal::offset(1.0, 62),
    ]
}

fn broken_stream() -> Vec<Signal> {
    vec![Signal::onset(0.0, 60, 100), Signal::offset(0.5, 64)]
}

#[test]
fn failure_does_not_disturb_parallel_reconstruction() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                if i % 2 == 0 {
                    reconstruct(good_stream()).map(|t| t.events)
                } else {
                    reconstruct(broken_stream()).map(|t| t.events)
                }
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.join().unwrap();
        if i % 2 == 0 {
            assert_eq!(
                result.unwrap(),
                vec![
                    NoteEvent::new(60, 100, 0.0, 2.0),
                    NoteEvent::new(62, 90, 1.0, 2.0),
                ]
            );
        } else {
            assert_eq!(
                result.unwrap_err(),
                ReconstructError::MissingOnset {
                    pitch: 64,
                    time: 0.5
                }
            );
        }
    }
}
