use claims::*;
use pretty_assertions::assert_eq;
use usb2000::{
    transport::fake::{FakeTransport, RecordingDelay},
    CancellationToken, Error, Revision, Spectrometer, SpectrometerConf, SpectroscopyExperiment,
    State,
};

fn connect(revision: Revision) -> (SpectroscopyExperiment<FakeTransport, RecordingDelay>, FakeTransport) {
    let fake = FakeTransport::new(revision);
    let spectrometer = Spectrometer::with_delay(
        fake.clone(),
        revision,
        SpectrometerConf::default(),
        RecordingDelay::default(),
    )
    .unwrap();
    (SpectroscopyExperiment::new(spectrometer), fake)
}

#[test]
fn single_shot_is_calibrated() {
    for revision in Revision::ALL {
        let (mut experiment, fake) = connect(revision);
        fake.push_spectrum((0..2048u16).collect());

        let spectrum = experiment.get_spectrum().unwrap();
        assert_eq!(spectrum.len(), 2028);
        assert_eq!(spectrum.intensities[0], 20);
        assert_eq!(spectrum.intensities[2027], 2047);
        assert!(spectrum.wavelengths.windows(2).all(|w| w[0] < w[1]));
        // 339.2 + 0.3826 * 20 + ...
        assert!((spectrum.wavelengths[0] - 346.84).abs() < 0.01);
    }
}

#[test]
fn integration_accumulates_until_cancelled() {
    let (mut experiment, fake) = connect(Revision::Usb2000Plus);
    for _ in 0..10 {
        fake.push_spectrum(vec![1000; 2048]);
    }
    let token = CancellationToken::new();
    let canceller = token.clone();

    let totals: Vec<u64> = experiment
        .integrate(10, token)
        .with_progress(move |shot| {
            if shot == 4 {
                canceller.cancel();
            }
        })
        .map(|spectrum| spectrum.unwrap().intensities[100])
        .collect();
    assert_eq!(totals, vec![1000, 2000, 3000, 4000]);

    // Device stays usable after a cancelled integration
    assert_ok!(experiment.get_spectrum());
}

#[test]
fn integration_time_changes_exposure() {
    let fake = FakeTransport::new(Revision::Usb2000Plus);
    let delay = RecordingDelay::default();
    let mut spectrometer = Spectrometer::with_delay(
        fake.clone(),
        Revision::Usb2000Plus,
        SpectrometerConf::default(),
        delay.clone(),
    )
    .unwrap();

    assert_matches!(
        spectrometer.set_integration_time(5_000),
        Err(Error::InvalidArgument(5_000))
    );
    assert_ok!(spectrometer.set_integration_time(250_000));
    assert_ok!(spectrometer.acquire_raw());
    assert_eq!(
        delay.delays(),
        vec![core::time::Duration::from_micros(250_000)]
    );
    assert_eq!(
        fake.writes().last().unwrap(),
        &(0x01, vec![0x09])
    );
}

#[test]
fn close_releases_device() {
    let (experiment, fake) = connect(Revision::Usb2000);
    let mut spectrometer = experiment.into_inner();
    assert_ok!(spectrometer.close());
    assert_eq!(spectrometer.state(), State::Closed);
    assert!(fake.is_closed());
    assert_eq!(fake.writes().last().unwrap(), &(0x02, vec![0x04, 0x00, 0x00]));

    // Second close is a no-op
    assert_ok!(spectrometer.close());
    assert_matches!(spectrometer.acquire_raw(), Err(Error::Closed));
}

#[test]
fn configuration_is_exposed() {
    let (experiment, _fake) = connect(Revision::Usb2000Plus);
    let configuration = experiment.spectrometer().configuration();
    assert_eq!(configuration.serial_number, "USB2+F00000");
    assert_eq!(configuration.wavelength_coefficients[0], 339.2);
    assert_eq!(configuration.nonlinearity_order, 7);
}
