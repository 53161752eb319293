//! Audio Analyzer (C8): turns a captured PCM stream into one
//! [`AudioFeatures`] record per frame (SPEC_FULL.md §4.8).
//!
//! Capture runs on `cpal`'s own callback thread; it never touches `Params`
//! or scheduler state directly, only pushes the latest frame across an
//! `mpsc` channel for the main thread to drain at the top of its tick,
//! matching the drain pattern in the ampactor-sonido audio processor this is
//! grounded on.

use std::{
        collections::VecDeque,
        sync::mpsc::{Receiver, Sender},
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::HostError;

pub const FFT_SIZE: usize = 2048;
pub const SMOOTHING: f64 = 0.3;
pub const SILENCE_THRESHOLD: f64 = 0.05;
const RHYTHM_WINDOW: usize = 15;
const ENERGY_HISTORY: usize = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures
{
        pub bass: f64,
        pub mid: f64,
        pub high: f64,
        pub energy: f64,
        pub transient: f64,
        pub rhythm: f64,
        pub peak: f64,
        pub smooth: f64,
}

/// Runs the FFT analysis on a mono sample window and produces one
/// [`AudioFeatures`] record, given the analyzer's rolling history.
pub struct Analyzer
{
        fft: std::sync::Arc<dyn rustfft::Fft<f32>>,
        sample_rate: f64,
        previous_energy: f64,
        energy_history: VecDeque<f64>,
        smooth_energy: f64,
}

impl Analyzer
{
        pub fn new(sample_rate: f64) -> Self
        {
                let mut planner = FftPlanner::<f32>::new();
                Self {
                        fft: planner.plan_fft_forward(FFT_SIZE),
                        sample_rate,
                        previous_energy: 0.0,
                        energy_history: VecDeque::with_capacity(ENERGY_HISTORY),
                        smooth_energy: 0.0,
                }
        }

        /// `samples` must contain exactly [`FFT_SIZE`] mono samples.
        pub fn analyze(
                &mut self,
                samples: &[f32],
        ) -> AudioFeatures
        {
                debug_assert_eq!(samples.len(), FFT_SIZE);

                let mut buffer: Vec<Complex<f32>> = samples
                        .iter()
                        .enumerate()
                        .map(|(i, &s)| {
                                let window = 0.5
                                        - 0.5 * (2.0 * std::f32::consts::PI * i as f32
                                                / (FFT_SIZE as f32 - 1.0))
                                                .cos();
                                Complex::new(s * window, 0.0)
                        })
                        .collect();

                self.fft.process(&mut buffer);

                let bin_hz = self.sample_rate / FFT_SIZE as f64;
                let magnitudes: Vec<f64> =
                        buffer[..FFT_SIZE / 2].iter().map(|c| c.norm() as f64).collect();

                let band_mean = |lo: f64, hi: f64| -> f64 {
                        let lo_bin = (lo / bin_hz).floor() as usize;
                        let hi_bin = ((hi / bin_hz).ceil() as usize).min(magnitudes.len());
                        if hi_bin <= lo_bin
                        {
                                return 0.0;
                        }
                        magnitudes[lo_bin..hi_bin].iter().sum::<f64>() / (hi_bin - lo_bin) as f64
                };

                let bass = band_mean(20.0, 250.0);
                let mid = band_mean(250.0, 2000.0);
                let high = band_mean(2000.0, 20000.0);

                let max_mag = magnitudes.iter().cloned().fold(0.0_f64, f64::max).max(1e-9);
                let energy = (magnitudes.iter().sum::<f64>()
                        / magnitudes.len() as f64
                        / max_mag)
                        .clamp(0.0, 1.0);

                let transient = (energy - self.previous_energy).max(0.0) * 10.0;
                self.previous_energy = energy;

                if self.energy_history.len() == ENERGY_HISTORY
                {
                        self.energy_history.pop_front();
                }
                self.energy_history.push_back(energy);

                let rhythm = self.windowed_autocorrelation();

                let peak = bass.max(mid).max(high);

                self.smooth_energy = self.smooth_energy * (1.0 - 0.1) + energy * 0.1;

                AudioFeatures {
                        bass: (bass / max_mag).clamp(0.0, 1.0),
                        mid: (mid / max_mag).clamp(0.0, 1.0),
                        high: (high / max_mag).clamp(0.0, 1.0),
                        energy,
                        transient: transient.clamp(0.0, 1.0),
                        rhythm,
                        peak: peak.clamp(0.0, 1.0),
                        smooth: self.smooth_energy,
                }
        }

        /// Windowed auto-correlation of the energy history, window size 15,
        /// scaled by 2 and clamped to `[0,1]` (SPEC_FULL.md §4.8).
        fn windowed_autocorrelation(&self) -> f64
        {
                let history: Vec<f64> = self.energy_history.iter().copied().collect();
                if history.len() < RHYTHM_WINDOW + 1
                {
                        return 0.0;
                }

                let window = &history[history.len() - RHYTHM_WINDOW..];
                let mean = window.iter().sum::<f64>() / window.len() as f64;

                let numerator: f64 = window
                        .windows(2)
                        .map(|pair| (pair[0] - mean) * (pair[1] - mean))
                        .sum();
                let denominator: f64 = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>().max(1e-9);

                ((numerator / denominator) * 2.0).clamp(0.0, 1.0)
        }
}

/// Owns the `cpal` input stream. Constructed only when the host opts in
/// (SPEC_FULL.md §4.8/§6: audio is opt-in, the rest of the system works
/// without it).
pub struct AudioCapture
{
        _stream: cpal::Stream,
        pub frames: Receiver<AudioFeatures>,
}

impl AudioCapture
{
        pub fn start(device_name: &str) -> Result<Self, HostError>
        {
                let host = cpal::default_host();

                let device = if device_name == "default"
                {
                        host.default_input_device()
                }
                else
                {
                        host.input_devices()
                                .ok()
                                .and_then(|mut devices| devices.find(|d| d.name().map(|n| n == device_name).unwrap_or(false)))
                }
                .ok_or(HostError::PermissionDenied {
                        channel: "audio",
                })?;

                let config = device
                        .default_input_config()
                        .map_err(|_| HostError::PermissionDenied {
                                channel: "audio",
                        })?;

                let sample_rate = config.sample_rate().0 as f64;
                let channels = config.channels() as usize;

                let (tx, rx): (Sender<AudioFeatures>, Receiver<AudioFeatures>) =
                        std::sync::mpsc::channel();

                let mut analyzer = Analyzer::new(sample_rate);
                let mut mono_buffer: Vec<f32> = Vec::with_capacity(FFT_SIZE);

                let stream = device
                        .build_input_stream(
                                &config.into(),
                                move |data: &[f32], _| {
                                        for frame in data.chunks(channels)
                                        {
                                                let mixed =
                                                        frame.iter().sum::<f32>() / channels.max(1) as f32;
                                                mono_buffer.push(mixed);

                                                if mono_buffer.len() == FFT_SIZE
                                                {
                                                        let features = analyzer.analyze(&mono_buffer);
                                                        let _ = tx.send(features);
                                                        mono_buffer.clear();
                                                }
                                        }
                                },
                                move |err| log::error!("audio capture stream error: {err}"),
                                None,
                        )
                        .map_err(|e| HostError::PermissionDenied {
                                channel: "audio",
                        })?;

                stream.play().map_err(|_| HostError::PermissionDenied {
                        channel: "audio",
                })?;

                Ok(Self {
                        _stream: stream,
                        frames: rx,
                })
        }

        /// Drains every queued frame, returning only the latest (older
        /// frames are replaced, not queued — SPEC_FULL.md §4.4).
        pub fn drain_latest(&self) -> Option<AudioFeatures>
        {
                let mut latest = None;
                while let Ok(frame) = self.frames.try_recv()
                {
                        latest = Some(frame);
                }
                latest
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn silence_produces_low_energy_and_no_transient()
        {
                let mut analyzer = Analyzer::new(44_100.0);
                let silence = vec![0.0_f32; FFT_SIZE];
                let features = analyzer.analyze(&silence);
                assert!(features.energy < SILENCE_THRESHOLD);
                assert_eq!(features.transient, 0.0);
        }

        #[test]
        fn rhythm_is_zero_before_window_fills()
        {
                let analyzer = Analyzer::new(44_100.0);
                assert_eq!(analyzer.windowed_autocorrelation(), 0.0);
        }

        #[test]
        fn tone_produces_bounded_features() -> Result<(), Box<dyn std::error::Error>>
        {
                let mut analyzer = Analyzer::new(44_100.0);
                let tone: Vec<f32> = (0..FFT_SIZE)
                        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
                        .collect();
                let features = analyzer.analyze(&tone);
                assert!(features.energy >= 0.0 && features.energy <= 1.0);
                assert!(features.peak >= 0.0 && features.peak <= 1.0);
                Ok(())
        }
}
