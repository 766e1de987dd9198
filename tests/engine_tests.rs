//! End-to-end scenarios over synthetic trace text.

use fstrace_studio::aggregator::{assemble_disk_stats, assemble_msg_stats};
use fstrace_studio::output::{read_tracelog, write_tracelog};
use fstrace_studio::parser::{parse_filters, KeyScheme, TraceParser};
use pretty_assertions::assert_eq;
use std::io::Cursor;

const HEADER: &str = "\
Trace started: Wed Jul 17 13:00:00 2013
Trace stopped: Wed Jul 17 13:05:00 2013
hex      elapsed  pid      tag      message
legend 4
legend 5
legend 6
legend 7
legend 8
";

fn qio(time: f64, pid: &str, disk: u32, addr: &str, sectors: u64) -> String {
    format!(
        "{time:.6} {pid} TRACE_IO: QIO: read data tag: 170693 20971520 f9 f10 f11 f12 f13 \
         diskid: 0A0B0C0D da {disk}:{addr} nSectors {sectors} align 4096\n"
    )
}

fn sio(time: f64, pid: &str, disk: u32, addr: &str, sectors: u64) -> String {
    format!(
        "{time:.6} {pid} TRACE_IO: SIO: doing f5 f6 f7 f8 diskid: 0A0B0C0D \
         da {disk}:{addr} nSectors {sectors}\n"
    )
}

fn fio(time: f64, pid: &str, disk: u32, addr: &str, sectors: u64) -> String {
    format!(
        "{time:.6} {pid} TRACE_IO: FIO: read data tag: 170693 20971520 f9 f10 f11 f12 f13 \
         diskid: 0A0B0C0D da {disk}:{addr} nSectors {sectors}\n"
    )
}

fn handle_directly(time: f64, pid: &str, msg: &str, msg_id: &str, ip: &str) -> String {
    format!(
        "{time:.6} {pid} TRACE_TS: tscHandleMsgDirectly: f4 f5 msg '{msg}' msg_id {msg_id}, \
         len 512 from 9 {ip}\n"
    )
}

fn approx(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
}

fn parse(trace: &str, filters: &str) -> fstrace_studio::parser::TraceLog {
    let parser = TraceParser::new(parse_filters(filters).unwrap(), KeyScheme::DiskAddress);
    parser.parse_stream(&mut Cursor::new(trace)).unwrap()
}

#[test]
fn complete_io_triple_yields_expected_disk_stats() {
    let mut trace = String::from(HEADER);
    trace.push_str(&qio(1.0, "77", 3, "0x4000", 8));
    trace.push_str(&sio(1.2, "77", 3, "0x4000", 8));
    trace.push_str(&fio(1.5, "77", 3, "0x4000", 8));

    let mut log = parse(&trace, "io");
    let report = assemble_disk_stats(&mut log);

    let stats = &report.disks[&3].stats;
    assert_eq!(stats.num_iops, 1);
    approx(stats.avg_io_sz, 4096.0);
    approx(stats.avg_io_tm, 0.3);
    approx(stats.longest_io, 0.3);
}

#[test]
fn finished_only_record_counts_bytes_but_not_timing() {
    let mut trace = String::from(HEADER);
    trace.push_str(&fio(2.0, "77", 5, "0x9000", 16));

    let mut log = parse(&trace, "io");
    let rec = &log.io["5:0x9000"];
    assert!(rec.is_complete());

    let report = assemble_disk_stats(&mut log);
    let stats = &report.disks[&5].stats;
    assert_eq!(stats.num_iops, 1);
    assert_eq!(stats.total_bytes_io, 16 * 512);
    assert_eq!(stats.timed_iops, 0);
    assert!(log.io["5:0x9000"].service_time.is_none());
    assert!(log.io["5:0x9000"].queue_time.is_none());
}

#[test]
fn unsupported_filter_fails_before_parsing() {
    assert!(parse_filters("io,frobnicate").is_err());
}

#[test]
fn recognized_category_unknown_op_creates_no_record() {
    let mut trace = String::from(HEADER);
    trace.push_str("1.000000 77 TRACE_IO: cleanupIO: buf 0x123 state 4\n");

    let log = parse(&trace, "io");
    assert!(log.io.is_empty());
}

#[test]
fn reply_handle_directly_never_reaches_received_stats() {
    let mut trace = String::from(HEADER);
    trace.push_str(&handle_directly(2.0, "55", "reply", "0x9A1", "10.0.0.2"));
    trace.push_str(&handle_directly(2.5, "56", "nsdMsgReadExt", "0x9A2", "10.0.0.2"));

    let log = parse(&trace, "messaging");
    let stats = assemble_msg_stats(&log);
    assert_eq!(stats.received_count("reply"), 0);
    assert_eq!(stats.received_count("nsdMsgReadExt"), 1);
}

#[test]
fn dump_round_trip_reproduces_disk_stats() {
    let mut trace = String::from(HEADER);
    trace.push_str(&qio(1.0, "77", 3, "0x4000", 8));
    trace.push_str(&sio(1.2, "77", 3, "0x4000", 8));
    trace.push_str(&fio(1.5, "77", 3, "0x4000", 8));
    trace.push_str(&fio(2.0, "78", 4, "0x100", 64));

    let mut log = parse(&trace, "io");

    let temp = tempfile::NamedTempFile::new().unwrap();
    write_tracelog(&log, temp.path()).unwrap();
    let mut reloaded = read_tracelog(temp.path()).unwrap();

    let direct = assemble_disk_stats(&mut log);
    let via_dump = assemble_disk_stats(&mut reloaded);

    assert_eq!(direct.disks.len(), via_dump.disks.len());
    for (disk, bucket) in &direct.disks {
        assert_eq!(&bucket.stats, &via_dump.disks[disk].stats);
    }
}

#[test]
fn elapsed_wall_time_comes_from_header_epochs() {
    let log = parse(HEADER, "io");
    assert_eq!(log.header.elapsed_secs(), 300);
}
