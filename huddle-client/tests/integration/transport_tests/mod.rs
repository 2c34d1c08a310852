mod test_webrtc_transport;
