use autodiff::{AutodiffErr, DType, Parameter, Tape, Tensor};

fn param(name: &str, value: f64) -> Parameter {
    Parameter::new(name, Tensor::scalar_of(value, DType::F64))
}

#[test]
fn non_persistent_tape_answers_a_single_query() {
    let w = param("w", 2.0);

    let tape = Tape::new();
    let v = tape.watch(&w).unwrap();
    let y = v.powi(3).unwrap();

    let grads = tape.gradient_for(&y, &[&w]).unwrap();
    assert_eq!(grads[0].to_scalar().unwrap(), 12.0);

    assert_eq!(tape.gradient_for(&y, &[&w]), Err(AutodiffErr::TapeConsumed));
    assert_eq!(tape.gradient(&y, &[&v]), Err(AutodiffErr::TapeConsumed));
}

#[test]
fn persistent_tape_answers_until_disposed() {
    let w = param("w", 3.0);

    let tape = Tape::persistent();
    assert!(tape.is_persistent());

    let v = tape.watch(&w).unwrap();
    let y = v.square().unwrap();
    let z = y.square().unwrap();

    let dy = tape.gradient_for(&y, &[&w]).unwrap();
    let dz = tape.gradient_for(&z, &[&w]).unwrap();
    let dz_again = tape.gradient_for(&z, &[&w]).unwrap();

    assert_eq!(dy[0].to_scalar().unwrap(), 6.0);
    assert_eq!(dz[0].to_scalar().unwrap(), 108.0);
    assert_eq!(dz, dz_again);

    tape.dispose();

    // Values outlive the tape.
    assert_eq!(z.to_scalar().unwrap(), 81.0);
}

#[test]
fn recording_after_a_query_fails_on_a_consumed_tape() {
    let w = param("w", 1.0);

    let tape = Tape::new();
    let v = tape.watch(&w).unwrap();
    tape.gradient_for(&v, &[&w]).unwrap();

    assert_eq!(v.exp().unwrap_err(), AutodiffErr::TapeConsumed);
}

#[test]
fn disconnected_parameters_get_zeros() {
    let used = param("used", 2.0);
    let unused = Parameter::new("unused", Tensor::zeros(&[2, 2], DType::F64));

    let tape = Tape::new();
    let v = tape.watch(&used).unwrap();
    tape.watch(&unused).unwrap();
    let y = v.scale(5.0).unwrap();

    let grads = tape.gradient_for(&y, &[&used, &unused]).unwrap();
    assert_eq!(grads[0].to_scalar().unwrap(), 5.0);
    assert_eq!(grads[1], Tensor::zeros(&[2, 2], DType::F64));
}

#[test]
fn unwatched_parameters_are_reported() {
    let watched = param("watched", 2.0);
    let stranger = param("stranger", 2.0);

    let tape = Tape::new();
    let y = tape.watch(&watched).unwrap().square().unwrap();

    assert_eq!(
        tape.gradient_for(&y, &[&watched, &stranger]),
        Err(AutodiffErr::NotWatched {
            name: "stranger".to_string()
        })
    );

    // The failed query doesn't consume the tape.
    assert!(tape.gradient_for(&y, &[&watched]).is_ok());
}

#[test]
fn constants_cannot_be_differentiated_against() {
    let tape = Tape::new();
    let c = tape.scalar(3.0).unwrap();
    let x = tape.variable(Tensor::scalar(2.0)).unwrap();
    let y = x.mul(&c).unwrap();

    assert!(matches!(
        tape.gradient(&y, &[&c]),
        Err(AutodiffErr::NotWatched { .. })
    ));
    assert_eq!(tape.gradient(&y, &[&x]).unwrap()[0].to_scalar().unwrap(), 3.0);
}

#[test]
fn frozen_parameters_are_recorded_as_constants() {
    let frozen = param("frozen", 1.0).frozen();

    let tape = Tape::new();
    let v = tape.watch(&frozen).unwrap();

    assert!(!v.is_tracked());
    assert!(!tape.is_watched(&frozen));
}

#[test]
fn watching_twice_returns_the_same_node() {
    let w = param("w", 2.0);

    let tape = Tape::new();
    let a = tape.watch(&w).unwrap();
    let b = tape.watch(&w).unwrap();
    let y = a.mul(&b).unwrap();

    assert_eq!(tape.len(), 2);
    assert_eq!(tape.gradient_for(&y, &[&w]).unwrap()[0].to_scalar().unwrap(), 4.0);
}

#[test]
fn values_from_another_tape_are_rejected() {
    let first = Tape::new();
    let second = Tape::new();
    let a = first.variable(Tensor::scalar(1.0)).unwrap();
    let b = second.variable(Tensor::scalar(1.0)).unwrap();

    assert_eq!(a.add(&b).unwrap_err(), AutodiffErr::ForeignVar);
    assert_eq!(first.gradient(&a, &[&b]), Err(AutodiffErr::ForeignVar));
}

#[test]
fn inference_tapes_only_evaluate() {
    let w = param("w", 2.0);

    let tape = Tape::inference();
    let v = tape.watch(&w).unwrap();
    let y = v.square().unwrap();

    assert_eq!(y.to_scalar().unwrap(), 4.0);
    assert!(!y.is_tracked());
    assert_eq!(tape.gradient(&y, &[]), Err(AutodiffErr::NotRecording));
}
