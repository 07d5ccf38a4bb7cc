use ridetl_core::{
    config::PipelineParameters,
    pipeline::RidePipeline,
    read::read_ride_from_reader,
    summary::RideSummary,
};
use time::{macros::datetime, Duration, OffsetDateTime};

const T0: OffsetDateTime = datetime!(2024-06-01 08:00:00 UTC);

fn trackpoint(seconds: i64, lat: f64, ele: f64) -> String {
    let t = (T0 + Duration::seconds(seconds))
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap();
    format!(r#"<trkpt lat="{lat}" lon="-1.5"><ele>{ele}</ele><time>{t}</time></trkpt>"#)
}

/// A ride heading north at about 25 mph for 30 seconds, a 60 second stop,
/// then 20 seconds of slow climbing recorded every 2 seconds.
fn sample_gpx() -> String {
    let mut points = Vec::new();
    for i in 0..30 {
        points.push(trackpoint(i, 53.0 + i as f64 * 0.0001, 100.0 + (i % 4) as f64));
    }
    // A duplicate timestamp, which should be dropped.
    points.push(trackpoint(29, 53.0029, 100.0));
    for i in 0..=10 {
        let secs = 89 + i * 2;
        points.push(trackpoint(secs, 53.003 + i as f64 * 0.00001, 110.0 + i as f64));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx creator="test" version="1.1">
  <trk><name>Test</name><trkseg>
{}
  </trkseg></trk>
</gpx>"#,
        points.join("\n")
    )
}

#[test]
fn test_full_pipeline() {
    let ride = read_ride_from_reader(sample_gpx().as_bytes(), "sample").unwrap();
    assert_eq!(ride.len(), 42);

    let pipeline = RidePipeline::new(PipelineParameters::default()).unwrap();
    let ride = pipeline.process(ride).unwrap();

    // 0..=29 and 89..=109 on a 1 second grid.
    assert_eq!(ride.len(), 30 + 21);
    assert_eq!(ride.segment_count(), 2);

    for pair in ride.samples.windows(2) {
        assert!(pair[0].time < pair[1].time);
        assert!(pair[0].segment_id <= pair[1].segment_id);
        if pair[0].segment_id == pair[1].segment_id {
            assert_eq!(pair[1].time - pair[0].time, Duration::SECOND);
            assert_eq!(pair[1].delta_time, 1.0);
        }
        assert!(pair[1].elapsed_ascent >= pair[0].elapsed_ascent);
        assert!(pair[1].elapsed_descent >= pair[0].elapsed_descent);
    }

    for s in &ride.samples {
        assert!((0.0..360.0).contains(&s.heading), "heading {}", s.heading);
        assert!(
            (s.elapsed_ascent + s.elapsed_descent - s.elapsed_elevation).abs() < 1e-9,
            "ascent {} descent {} elevation {}",
            s.elapsed_ascent,
            s.elapsed_descent,
            s.elapsed_elevation
        );
        assert!(s.training_window_id.is_some());
    }

    // The first sample of each segment has no distance and so no speed.
    let second_segment_start = ride.samples.iter().position(|s| s.segment_id == 1).unwrap();
    assert_eq!(second_segment_start, 30);
    assert!(ride.samples[0].delta_dist.is_nan());
    assert!(ride.samples[30].delta_dist.is_nan());
    assert!(!ride.samples[30].is_cruising);

    // Heading north quickly: cruising in the first segment, not in the second.
    assert!(ride.samples[1..30].iter().all(|s| s.is_cruising));
    assert!(ride.samples[30..].iter().all(|s| !s.is_cruising));
    assert!(ride.samples[5].heading < 1e-6);

    let summary = RideSummary::from_ride(&ride).unwrap();
    assert_eq!(summary.segment_count, 2);
    assert_eq!(summary.row_count, 51);
    assert_eq!(summary.moving_time, 30.0 + 21.0);
    assert_eq!(summary.elapsed_time, 110.0);
    assert!(summary.distance > 0.2 && summary.distance < 0.25);
    assert!(summary.cruise_speed > 24.0 && summary.cruise_speed < 26.0);
}

#[test]
fn test_process_all_keeps_going_after_a_bad_ride() {
    let good = read_ride_from_reader(sample_gpx().as_bytes(), "good").unwrap();
    let mut bad = good.clone();
    bad.ride_id = "bad".to_string();
    bad.samples.swap(3, 4);

    let pipeline = RidePipeline::new(PipelineParameters::default()).unwrap();
    let results = pipeline.process_all(vec![bad, good]);

    assert_eq!(results[0].0, "bad");
    let err = results[0].1.as_ref().unwrap_err();
    assert!(format!("{err:#}").contains("not in order"));
    assert!(results[1].1.is_ok());
}
