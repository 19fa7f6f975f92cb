//! Tests for the asymmetric slew/LFO engine


use cosmos_dsp::port::{InputPort, OutputPort};
use cosmos_dsp::slew_lfo::{
    default_rise_fall, Capacitor, Mode, Rate, SlewLfo, SlewLfoConfig, SlewLfoInputs, SlewLfoParams,
};

fn slew_params(rate: Rate, rise: f32, fall: f32) -> SlewLfoParams {
    SlewLfoParams {
        mode: Mode::Slew,
        rate,
        capacitor: Capacitor::None,
        curve: 1.0,
        rise,
        fall,
    }
}

fn lfo_params(rate: Rate, rise: f32, fall: f32) -> SlewLfoParams {
    SlewLfoParams {
        mode: Mode::Lfo,
        ..slew_params(rate, rise, fall)
    }
}

fn step_input(voltage: f32) -> SlewLfoInputs {
    SlewLfoInputs {
        input: InputPort::mono(voltage),
        ..Default::default()
    }
}

#[test]
fn slew_never_overshoots_a_step() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    let mut output = OutputPort::new();

    let params = slew_params(Rate::Fast, 0.5, 0.5);
    let inputs = step_input(10.0);

    let mut previous = 0.0;
    for _ in 0..(2.0 * sample_rate) as usize {
        module.process(dt, &params, &inputs, &mut output);
        let out = output.voltages[0];
        assert!(out >= previous, "rising output went backwards");
        assert!(out <= 10.0, "overshoot to {out}");
        previous = out;
    }
    assert_eq!(previous, 10.0);

    // Falling back down behaves symmetrically.
    let inputs = step_input(0.0);
    for _ in 0..(2.0 * sample_rate) as usize {
        module.process(dt, &params, &inputs, &mut output);
        let out = output.voltages[0];
        assert!(out <= previous, "falling output went backwards");
        assert!(out >= 0.0, "undershoot to {out}");
        previous = out;
    }
    assert_eq!(previous, 0.0);
}

#[test]
fn slew_rise_time_matches_rate_law() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    let mut output = OutputPort::new();

    // Slow tier, no capacitor, mid-scale rise: the effective slew is the
    // geometric mean of the tier's extremes, sqrt(0.1 * 100) V/s, so a
    // 10 V traverse takes sqrt(10) seconds.
    let params = slew_params(Rate::Slow, 0.5, 0.5);
    let inputs = step_input(10.0);

    let mut samples = 0usize;
    while output.voltages[0] < 10.0 {
        module.process(dt, &params, &inputs, &mut output);
        samples += 1;
        assert!(samples < (200.0 * sample_rate) as usize, "never reached 10V");
    }

    let time = samples as f32 * dt;
    let expected = 10.0_f32.sqrt();
    assert!((time - expected).abs() / expected < 0.01, "rise time {time}s");

    // Within this tier's documented traverse-time bounds.
    assert!(time > 0.1 && time < 100.0);
}

#[test]
fn lfo_stays_within_bounds() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    let mut output = OutputPort::new();

    let params = lfo_params(Rate::Fast, 0.5, 0.5);
    let inputs = SlewLfoInputs::default();

    let mut wav_data = Vec::new();
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for _ in 0..(2.0 * sample_rate) as usize {
        module.process(dt, &params, &inputs, &mut output);
        let out = output.voltages[0];
        min = min.min(out);
        max = max.max(out);
        wav_data.push(out / 10.0);
    }

    assert!(min >= 0.0, "fell to {min}");
    assert!(max <= 10.0, "rose to {max}");
    // It actually oscillates over the full span.
    assert!(min < 0.1 && max > 9.9);

    wav_writer::write("slew_lfo/lfo.wav", sample_rate as u32, &wav_data).ok();
}

/// Measured LFO frequency from rising crossings of the midpoint.
fn lfo_frequency(sample_rate: f32, duration: f32) -> f32 {
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    let mut output = OutputPort::new();

    let params = lfo_params(Rate::Fast, 0.5, 0.5);
    let inputs = SlewLfoInputs::default();

    let mut crossings = 0usize;
    let mut first = None;
    let mut last = 0usize;
    let mut previous = 0.0;
    let frames = (duration * sample_rate) as usize;
    for n in 0..frames {
        module.process(dt, &params, &inputs, &mut output);
        let out = output.voltages[0];
        if previous < 5.0 && out >= 5.0 {
            if first.is_none() {
                first = Some(n);
            }
            last = n;
            crossings += 1;
        }
        previous = out;
    }

    assert!(crossings > 2, "no oscillation measured");
    (crossings - 1) as f32 / ((last - first.unwrap()) as f32 * dt)
}

#[test]
fn lfo_period_is_independent_of_sample_rate() {
    // Mid-scale rise/fall in the fast tier: each traverse runs at
    // sqrt(10 * 10000) V/s, giving a period of about 63 ms. The remainder
    // correction keeps the measured frequency within 1% across rates.
    let f_48k = lfo_frequency(48000.0, 2.0);
    let f_44k1 = lfo_frequency(44100.0, 2.0);

    let expected = 1.0 / (2.0 * 10.0 / (10.0_f32 * 10000.0).sqrt());
    assert!((f_48k - expected).abs() / expected < 0.01, "48k: {f_48k} Hz");
    assert!(
        (f_48k - f_44k1).abs() / f_48k < 0.01,
        "44.1k: {f_44k1} Hz vs {f_48k} Hz"
    );
}

#[test]
fn asymmetric_rates_shape_the_waveform() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    let mut output = OutputPort::new();

    // Slow rise, fast fall: the output spends far more time climbing than
    // dropping. A higher rate control maps to a slower traverse.
    let params = lfo_params(Rate::Fast, 0.9, 0.3);
    let inputs = SlewLfoInputs::default();

    let mut rising = 0usize;
    let mut falling = 0usize;
    let mut previous = 0.0;
    let frames = (2.0 * sample_rate) as usize;
    for _ in 0..frames {
        module.process(dt, &params, &inputs, &mut output);
        let out = output.voltages[0];
        if out > previous {
            rising += 1;
        } else if out < previous {
            falling += 1;
        }
        previous = out;
    }

    assert!(rising > 10 * falling, "rising {rising}, falling {falling}");
}

#[test]
fn rate_cv_modulates_the_rise() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;

    let time_to_target = |rise_cv: f32| {
        let mut module = SlewLfo::new();
        let mut output = OutputPort::new();
        let params = slew_params(Rate::Fast, 0.5, 0.5);
        let inputs = SlewLfoInputs {
            input: InputPort::mono(10.0),
            rise_cv: InputPort::mono(rise_cv),
            ..Default::default()
        };
        let mut samples = 0usize;
        while output.voltages[0] < 10.0 {
            module.process(dt, &params, &inputs, &mut output);
            samples += 1;
            assert!(samples < (10.0 * sample_rate) as usize);
        }
        samples
    };

    // Positive rate CV slows the traverse down, negative CV speeds it up.
    assert!(time_to_target(2.0) > time_to_target(0.0));
    assert!(time_to_target(-2.0) < time_to_target(0.0));
}

#[test]
fn exponential_curve_still_reaches_the_target() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    let mut output = OutputPort::new();

    // Full curve: mostly proportional charging, with the residual linear
    // term guaranteeing the boundary is reached.
    let params = SlewLfoParams {
        curve: 0.0,
        ..lfo_params(Rate::Fast, 0.5, 0.5)
    };
    let inputs = SlewLfoInputs::default();

    let mut max: f32 = 0.0;
    for _ in 0..(4.0 * sample_rate) as usize {
        module.process(dt, &params, &inputs, &mut output);
        max = max.max(output.voltages[0]);
    }
    assert!(max > 9.9 && max <= 10.0, "peak {max}");
}

#[test]
fn oversampled_slew_never_overshoots() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    module.set_config(SlewLfoConfig {
        oversampling_index: 2,
        ..Default::default()
    });
    let mut output = OutputPort::new();

    // Fastest rise in the fast tier: a 1 ms traverse with the sharpest
    // corner at the target, where decimation-filter ringing would show.
    let params = slew_params(Rate::Fast, 0.0, 0.0);
    let inputs = step_input(10.0);

    let mut previous = 0.0;
    for _ in 0..1000 {
        module.process(dt, &params, &inputs, &mut output);
        let out = output.voltages[0];
        assert!(out >= previous, "rising output went backwards");
        assert!(out <= 10.0, "overshoot to {out}");
        previous = out;
    }
    assert_eq!(previous, 10.0);

    // Falling toward a negative target behaves symmetrically.
    let inputs = step_input(-4.0);
    for _ in 0..1000 {
        module.process(dt, &params, &inputs, &mut output);
        let out = output.voltages[0];
        assert!(out <= previous, "falling output went backwards");
        assert!(out >= -4.0, "undershoot to {out}");
        previous = out;
    }
    assert_eq!(previous, -4.0);
}

#[test]
fn dc_removal_centers_the_fast_lfo() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    module.set_config(SlewLfoConfig {
        remove_dc: true,
        ..Default::default()
    });
    let mut output = OutputPort::new();

    let params = lfo_params(Rate::Fast, 0.5, 0.5);
    let inputs = SlewLfoInputs::default();

    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for _ in 0..(2.0 * sample_rate) as usize {
        module.process(dt, &params, &inputs, &mut output);
        min = min.min(output.voltages[0]);
        max = max.max(output.voltages[0]);
    }
    assert!(min >= -5.0 && min < -4.9);
    assert!(max <= 5.0 && max > 4.9);

    // The slow tier stays unipolar regardless of the flag.
    let params = lfo_params(Rate::Slow, 0.9, 0.9);
    let mut min = f32::MAX;
    for _ in 0..(2.0 * sample_rate) as usize {
        module.process(dt, &params, &inputs, &mut output);
        min = min.min(output.voltages[0]);
    }
    assert!(min >= 0.0);
}

#[test]
fn oversampled_lfo_keeps_its_frequency() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;

    let frequency = |oversampling_index: usize| {
        let mut module = SlewLfo::new();
        module.set_config(SlewLfoConfig {
            oversampling_index,
            ..Default::default()
        });
        let mut output = OutputPort::new();
        let params = lfo_params(Rate::Fast, 0.5, 0.5);
        let inputs = SlewLfoInputs::default();

        let mut crossings = 0usize;
        let mut first = None;
        let mut last = 0usize;
        let mut previous = 0.0;
        for n in 0..(2.0 * sample_rate) as usize {
            module.process(dt, &params, &inputs, &mut output);
            let out = output.voltages[0];
            if previous < 5.0 && out >= 5.0 {
                if first.is_none() {
                    first = Some(n);
                }
                last = n;
                crossings += 1;
            }
            previous = out;
        }
        assert!(crossings > 2);
        (crossings - 1) as f32 / ((last - first.unwrap()) as f32 * dt)
    };

    let base = frequency(0);
    let oversampled = frequency(2);
    assert!(
        (base - oversampled).abs() / base < 0.02,
        "{oversampled} Hz vs {base} Hz"
    );
}

#[test]
fn polyphonic_lanes_run_independently() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    let mut output = OutputPort::new();

    let params = slew_params(Rate::Fast, 0.5, 0.5);
    let inputs = SlewLfoInputs {
        input: InputPort::poly(&[10.0, 2.0, -4.0]),
        ..Default::default()
    };

    for _ in 0..(4.0 * sample_rate) as usize {
        module.process(dt, &params, &inputs, &mut output);
    }

    assert_eq!(output.channels, 3);
    assert_eq!(output.voltages[0], 10.0);
    assert_eq!(output.voltages[1], 2.0);
    assert_eq!(output.voltages[2], -4.0);
}

#[test]
fn mode_dependent_reset_defaults() {
    assert_eq!(default_rise_fall(Mode::Slew), (0.0, 0.0));
    assert_eq!(default_rise_fall(Mode::Lfo), (0.5, 0.5));
}

#[test]
fn input_light_is_dark_in_lfo_mode() {
    let sample_rate = 48000.0;
    let dt = 1.0 / sample_rate;
    let mut module = SlewLfo::new();
    let mut output = OutputPort::new();

    let params = lfo_params(Rate::Fast, 0.5, 0.5);
    let inputs = step_input(10.0);
    for _ in 0..10000 {
        module.process(dt, &params, &inputs, &mut output);
    }
    assert!(module.in_light().green() < 1e-3);
    assert!(module.in_light().red() < 1e-3);

    // Back in slew mode the same input lights up.
    let params = slew_params(Rate::Fast, 0.5, 0.5);
    for _ in 0..10000 {
        module.process(dt, &params, &inputs, &mut output);
    }
    assert!(module.in_light().green() > 0.9);
}
