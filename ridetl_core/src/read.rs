#![allow(clippy::single_match)]

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{bail, Context, Result};
use log::info;
use logging_timer::time;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use time::{format_description::well_known, OffsetDateTime, UtcOffset};

use crate::model::{Ride, RideSample};

/*
Only the parts of the document that carry samples are parsed, everything
else is skipped.

<gpx>
   <trk>                 parse_track
       <trkseg>          parse_track_segment
           <trkpt>       parse_trackpoint
               <ele>
               <time>
*/

/// Reads a ride from a GPX file. The ride id is the file stem.
pub fn read_ride_from_file<P: AsRef<Path>>(input_file: P) -> Result<Ride> {
    let input_file = input_file.as_ref();
    info!("Reading GPX file {:?}", input_file);

    let ride_id = input_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .with_context(|| format!("Cannot make a ride id from {:?}", input_file))?;

    let file = File::open(input_file).with_context(|| format!("Failed to open {:?}", input_file))?;
    let mut ride = read_ride_from_reader(BufReader::new(file), &ride_id)
        .with_context(|| format!("Failed to read GPX file {:?}", input_file))?;
    ride.filename = Some(input_file.to_owned());
    info!("Read {} samples from {:?}", ride.len(), input_file);

    Ok(ride)
}

/// Reads a ride from GPX text. The trackpoints of every track and track
/// segment are concatenated, in document order.
#[time]
pub fn read_ride_from_reader<R: BufRead>(input: R, ride_id: &str) -> Result<Ride> {
    let mut reader = Reader::from_reader(input);
    let mut buf: Vec<u8> = Vec::with_capacity(512);
    let mut samples = Vec::new();
    let mut seen_gpx = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"gpx" => {
                    seen_gpx = true;
                }
                b"trk" => {
                    parse_track(&mut reader, &mut samples)?;
                }
                _ => skip_element(&mut reader, &e)?,
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"gpx" => {
                    return Ok(Ride::new(ride_id, samples));
                }
                _ => (),
            },
            Ok(Event::Eof) => {
                if seen_gpx {
                    bail!("Reached EOF before the closing gpx tag, the file is probably truncated");
                }
                bail!("No gpx element found, this is not a GPX document");
            }
            Err(e) => bail!("Error at position {}: {:?}", reader.error_position(), e),
            _ => (),
        }

        buf.clear();
    }
}

fn parse_track<R: BufRead>(reader: &mut Reader<R>, samples: &mut Vec<RideSample>) -> Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(512);

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"trkseg" => {
                    parse_track_segment(reader, samples)?;
                }
                _ => skip_element(reader, &e)?,
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"trk" => return Ok(()),
                _ => (),
            },
            Ok(Event::Eof) => bail!("Reached EOF inside a trk element"),
            Err(e) => bail!("Error at position {}: {:?}", reader.error_position(), e),
            _ => (),
        }

        buf.clear();
    }
}

fn parse_track_segment<R: BufRead>(
    reader: &mut Reader<R>,
    samples: &mut Vec<RideSample>,
) -> Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(512);

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"trkpt" => {
                    let lat = read_attribute_as_f64(&e, "lat")?;
                    let lon = read_attribute_as_f64(&e, "lon")?;
                    samples.push(parse_trackpoint(reader, lat, lon)?);
                }
                _ => skip_element(reader, &e)?,
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"trkpt" => bail!(
                    "Trackpoint number {} has no ele or time element",
                    samples.len() + 1
                ),
                _ => (),
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"trkseg" => return Ok(()),
                _ => (),
            },
            Ok(Event::Eof) => bail!("Reached EOF inside a trkseg element"),
            Err(e) => bail!("Error at position {}: {:?}", reader.error_position(), e),
            _ => (),
        }

        buf.clear();
    }
}

fn parse_trackpoint<R: BufRead>(reader: &mut Reader<R>, lat: f64, lon: f64) -> Result<RideSample> {
    let mut buf: Vec<u8> = Vec::with_capacity(256);
    let mut ele = None;
    let mut time = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"ele" => {
                    ele = Some(read_inner_as_f64(reader)?);
                }
                b"time" => {
                    time = Some(read_inner_as_time(reader)?);
                }
                _ => skip_element(reader, &e)?,
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"trkpt" => {
                    let ele = ele
                        .with_context(|| format!("Trackpoint at {lat},{lon} has no ele element"))?;
                    let time = time
                        .with_context(|| format!("Trackpoint at {lat},{lon} has no time element"))?;
                    return Ok(RideSample::new(time, lat, lon, ele));
                }
                _ => (),
            },
            Ok(Event::Eof) => bail!("Reached EOF inside a trkpt element"),
            Err(e) => bail!("Error at position {}: {:?}", reader.error_position(), e),
            _ => (),
        }

        buf.clear();
    }
}

/// Skips over an element we have no interest in, including all its children.
fn skip_element<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    reader.read_to_end_into(start.name(), &mut buf)?;
    Ok(())
}

fn read_attribute_as_f64(tag: &BytesStart<'_>, attribute_name: &str) -> Result<f64> {
    let Some(attr) = tag.try_get_attribute(attribute_name)? else {
        bail!("Mandatory attribute '{attribute_name}' was missing on a trkpt element");
    };

    let value = attr.unescape_value()?;
    value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Could not parse attribute {attribute_name}={value:?} as a number"))
}

/// Reads the 'INNER TEXT' from a tag such as <tag>INNER TEXT</tag>.
fn read_inner_as_string<R: BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut buf: Vec<u8> = Vec::with_capacity(64);
    match reader.read_event_into(&mut buf) {
        Ok(Event::Text(text)) => Ok(text.unescape()?.trim().to_string()),
        e => bail!("Got unexpected XML event {:?} (was expecting text)", e),
    }
}

fn read_inner_as_f64<R: BufRead>(reader: &mut Reader<R>) -> Result<f64> {
    let t = read_inner_as_string(reader)?;
    t.parse::<f64>()
        .with_context(|| format!("Could not parse {t:?} as a number"))
}

/// Reads a <time>2024-09-21T06:59:46.000Z</time> tag. Times with an offset
/// are converted to UTC.
fn read_inner_as_time<R: BufRead>(reader: &mut Reader<R>) -> Result<OffsetDateTime> {
    let t = read_inner_as_string(reader)?;
    let time = OffsetDateTime::parse(&t, &well_known::Rfc3339)
        .with_context(|| format!("Could not parse {t:?} as an RFC 3339 time"))?;
    Ok(time.to_offset(UtcOffset::UTC))
}
