//! Line channel behavior over a socketpair-backed fd transport.

use m1bridge_communication::{FdTransport, LineChannel, ReadLine};
use std::io::Write;
use std::os::fd::IntoRawFd;
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::{Duration, Instant};

/// A channel reading and writing one end of a socketpair, plus the other
/// end for the test to drive.
fn fd_channel() -> (LineChannel, UnixStream) {
    let (ours, theirs) = UnixStream::pair().expect("socketpair");
    let read_fd = ours.try_clone().expect("clone stream").into_raw_fd();
    let write_fd = ours.into_raw_fd();
    let transport = FdTransport::from_raw(read_fd, Some(write_fd)).expect("fd transport");
    (LineChannel::new(Box::new(transport)), theirs)
}

#[test]
fn readline_times_out_no_earlier_than_requested() {
    let (mut channel, _peer) = fd_channel();

    let start = Instant::now();
    let result = channel.readline(Some(Duration::from_millis(100))).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(result, ReadLine::TimedOut);
}

#[test]
fn partial_line_is_held_until_separator_arrives() {
    let (mut channel, mut peer) = fd_channel();

    peer.write_all(b"no-newline").unwrap();
    let start = Instant::now();
    let result = channel.readline(Some(Duration::from_millis(100))).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(result, ReadLine::TimedOut);

    peer.write_all(b"-more\ntest").unwrap();
    let start = Instant::now();
    let result = channel.readline(Some(Duration::from_millis(100))).unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(result, ReadLine::Line(b"no-newline-more\n".to_vec()));

    // Remaining buffered bytes come out through read().
    let rest = channel.read(100, Some(Duration::from_millis(10))).unwrap();
    assert_eq!(rest, b"test");
}

#[test]
fn readline_accumulates_across_delayed_writes() {
    let (mut channel, mut peer) = fd_channel();

    let sender = thread::spawn(move || {
        peer.write_all(b"part1").unwrap();
        thread::sleep(Duration::from_millis(100));
        peer.write_all(b"-part2\npart3").unwrap();
        peer // keep the peer alive until the read finished
    });

    let start = Instant::now();
    let result = channel.readline(Some(Duration::from_secs(1))).unwrap();
    let elapsed = start.elapsed();
    assert_eq!(result, ReadLine::Line(b"part1-part2\n".to_vec()));
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(1));

    let rest = channel.read(100, Some(Duration::from_millis(10))).unwrap();
    assert_eq!(rest, b"part3");
    drop(sender.join().unwrap());
}

#[test]
fn carriage_return_before_newline_is_normalized() {
    let (mut channel, mut peer) = fd_channel();

    peer.write_all(b"G1 X1\r\n").unwrap();
    let result = channel.readline(Some(Duration::from_millis(200))).unwrap();
    assert_eq!(result, ReadLine::Line(b"G1 X1\n".to_vec()));
}

#[test]
fn read_returns_buffered_bytes_immediately() {
    let (mut channel, mut peer) = fd_channel();

    peer.write_all(b"abcdef").unwrap();
    // Let the bytes land in the kernel buffer, then pull them in two reads.
    thread::sleep(Duration::from_millis(20));
    assert_eq!(channel.read(4, Some(Duration::from_millis(200))).unwrap(), b"abcd");

    let start = Instant::now();
    assert_eq!(channel.read(4, Some(Duration::from_millis(200))).unwrap(), b"ef");
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[test]
fn read_on_silent_channel_returns_empty_after_timeout() {
    let (mut channel, _peer) = fd_channel();

    let start = Instant::now();
    let data = channel.read(16, Some(Duration::from_millis(100))).unwrap();
    assert!(data.is_empty());
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn peer_hangup_is_reported_as_closed() {
    let (mut channel, peer) = fd_channel();
    drop(peer);

    let err = channel
        .readline(Some(Duration::from_millis(200)))
        .unwrap_err();
    assert!(err.is_channel_closed(), "unexpected error: {err}");
}

#[test]
fn tcp_transport_reads_lines_and_writes_acks() {
    use m1bridge_communication::TcpTransport;
    use std::io::Read;
    use std::net::{TcpListener, TcpStream};

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"G0 X0 Y0\n").unwrap();
        let mut ack = [0u8; 3];
        stream.read_exact(&mut ack).unwrap();
        ack
    });

    let (stream, peer) = listener.accept().unwrap();
    let transport = TcpTransport::from_stream(stream, peer).unwrap();
    let mut channel = LineChannel::new(Box::new(transport));

    let line = channel.readline(Some(Duration::from_secs(1))).unwrap();
    assert_eq!(line, ReadLine::Line(b"G0 X0 Y0\n".to_vec()));
    channel.write_flush(b"ok\n").unwrap();

    assert_eq!(&client.join().unwrap(), b"ok\n");
}

#[test]
fn write_flush_round_trip() {
    let (mut channel, peer) = fd_channel();

    assert_eq!(channel.write_flush(b"ok\n").unwrap(), 3);

    let mut peer = peer;
    use std::io::Read;
    let mut buf = [0u8; 3];
    peer.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ok\n");
}
