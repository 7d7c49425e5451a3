mod common;

use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use beanstalk_wire::{Beanstalk, BeanstalkError, Reason};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

#[test]
fn payloads_round_trip_byte_for_byte() {
    let mut conn = common::connected();
    let payloads: Vec<Vec<u8>> = vec![
        b"hello".to_vec(),
        Vec::new(),
        b"line one\r\nline two\n".to_vec(),
        vec![0, 13, 10, 32, 255, 0],
        b"RESERVED 1 2\r\n".to_vec(),
    ];

    for payload in &payloads {
        conn.put_default(payload).unwrap();
    }
    for payload in &payloads {
        let job = conn.reserve().unwrap();
        assert_eq!(job.body(), &payload[..]);
        conn.delete(&job).unwrap();
    }
}

#[test]
fn gzip_payload_survives() {
    let mut conn = common::connected();

    let mut e = GzEncoder::new(Vec::new(), Compression::default());
    e.write_all(b"Hello beanstalk compressed").unwrap();
    let buf = e.finish().unwrap();
    conn.put_default(&buf).unwrap();

    let job = conn.reserve().unwrap();
    let mut gz = GzDecoder::new(job.body());
    let mut s = String::new();
    gz.read_to_string(&mut s).unwrap();
    assert_eq!(s, "Hello beanstalk compressed");
    conn.delete(&job).unwrap();
}

#[test]
fn peek_ready_sees_the_job_just_put() {
    let mut conn = common::connected();
    assert_eq!(conn.peek_ready().unwrap(), None);

    let id = conn.put_default(b"42").unwrap();
    let job = conn.peek_ready().unwrap().expect("ready job");
    assert_eq!(job.id(), id);
    assert_eq!(job.as_integer().unwrap(), 42);
}

#[test]
fn zero_timeout_on_empty_tube_is_not_an_error() {
    let mut conn = common::connected();
    assert_eq!(conn.reserve_with_timeout(Duration::from_secs(0)).unwrap(), None);
    assert!(conn.is_connected());
}

#[test]
fn watching_more_tubes_never_lowers_the_count() {
    let mut conn = common::connected();
    let x = conn.watch("x").unwrap();
    let y = conn.watch("y").unwrap();
    let again = conn.watch("y").unwrap();
    assert!(x <= y && y <= again);
}

#[test]
fn reserve_takes_jobs_from_every_watched_tube() {
    let mut conn = common::connected();
    conn.use_tube("x").unwrap();
    let in_x = conn.put_default(b"from x").unwrap();
    conn.use_tube("y").unwrap();
    let in_y = conn.put_default(b"from y").unwrap();

    assert_eq!(conn.reserve_with_timeout(Duration::from_secs(0)).unwrap(), None);

    conn.watch("x").unwrap();
    conn.watch("y").unwrap();
    let first = conn.reserve().unwrap();
    let second = conn.reserve().unwrap();
    let mut ids = vec![first.id(), second.id()];
    ids.sort_unstable();
    assert_eq!(ids, vec![in_x, in_y]);
    assert_eq!(first.body(), b"from x");
    assert_eq!(second.body(), b"from y");
}

#[test]
fn peek_ready_only_looks_at_the_used_tube() {
    let mut conn = common::connected();
    conn.use_tube("x").unwrap();
    conn.put_default(b"in x").unwrap();
    conn.use_tube("default").unwrap();
    assert_eq!(conn.peek_ready().unwrap(), None);
}

#[test]
fn list_tubes_returns_bare_names() {
    let mut conn = common::connected();
    conn.use_tube("foo").unwrap();
    assert_eq!(conn.list_tubes().unwrap(), vec!["default", "foo"]);
}

#[test]
fn oversized_job_is_rejected_without_breaking_the_connection() {
    let mut conn = common::connected();
    let big = vec![b'x'; common::MAX_JOB_SIZE + 1];
    let err = conn.put_default(&big).unwrap_err();
    assert_eq!(err.reason(), Some(Reason::JobTooBig));
    assert!(conn.put_default(b"fits").is_ok());
}

#[test]
fn settling_a_job_twice() {
    let mut conn = common::connected();
    conn.put_default(b"once").unwrap();
    let job = conn.reserve().unwrap();
    conn.bury_default(&job).unwrap();
    conn.delete(&job).unwrap();

    let err = conn.bury_default(&job).unwrap_err();
    assert_eq!(err.reason(), Some(Reason::NotFound));

    let err = conn.delete(&job).unwrap_err();
    assert_eq!(err.reason(), Some(Reason::BadFormat));
    assert!(err.to_string().contains("NOT_FOUND"));
}

#[test]
fn jobs_stay_with_their_connection() {
    let mut producer = common::connected();
    let mut worker = common::connected();
    producer.put_default(b"mine").unwrap();
    let job = producer.reserve().unwrap();

    assert!(matches!(
        worker.delete(&job),
        Err(BeanstalkError::ForeignJob { job_id }) if job_id == job.id()
    ));
    producer.delete(&job).unwrap();
}

#[test]
fn connect_failure_is_a_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = Beanstalk::new()
        .host("127.0.0.1")
        .port(port)
        .connection_timeout(Some(Duration::from_secs(1)))
        .connect()
        .unwrap_err();
    assert!(matches!(err, BeanstalkError::Connect(_)), "{:?}", err);
    assert!(err.is_transport());
    assert!(err.to_string().contains("unable to connect"));
}

#[test]
fn sub_second_connect_timeout_connects() {
    let port = common::spawn();
    let mut conn = Beanstalk::new()
        .host("127.0.0.1")
        .port(port)
        .connection_timeout(Some(Duration::from_millis(500)))
        .connect()
        .unwrap();
    assert_eq!(conn.config().connect_timeout(), Some(Duration::from_millis(500)));
    assert_eq!(conn.list_tubes().unwrap(), vec!["default"]);
}

#[test]
fn commands_before_connect_fail() {
    let mut conn = Beanstalk::new();
    assert!(matches!(conn.list_tubes(), Err(BeanstalkError::NotConnected)));
}

#[test]
fn quit_closes_cleanly() {
    let conn = common::connected();
    conn.quit().unwrap();
}
